//! Transport layer for talking to HS1xx plugs.
//!
//! One call opens one socket, writes one frame, reads one reply and drops
//! the socket again, whatever the outcome. The whole exchange shares a single
//! deadline derived from [`Target::timeout`]; nothing is retried.
//!
//! Use [`execute`] for one-off commands, or hold a [`LegacyTransport`] (or
//! any other [`Transport`]) inside a device handle.

pub mod legacy;

pub use legacy::LegacyTransport;

use std::{net::Ipv6Addr, time::Duration};

use async_trait::async_trait;

use crate::{commands::Command, error::Result, frame::Mode};

/// Default TCP/UDP port for HS1xx plugs.
pub const DEFAULT_PORT: u16 = 9999;

/// Default per-call time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Hostname or IP address.
    pub host: String,
    /// Port, normally [`DEFAULT_PORT`].
    pub port: u16,
    /// Framing convention.
    pub mode: Mode,
    /// Budget for connect, write and read together.
    pub timeout: Duration,
}

impl Target {
    /// A TCP target on the default port with the default timeout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            mode: Mode::Tcp,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the framing convention.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn addr(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Sends `command` to `target` and returns the decoded JSON reply.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use hsplug_core::{commands, transport::{Target, execute}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), hsplug_core::Error> {
///     let target = Target::new("192.168.1.100").with_timeout(Duration::from_secs(2));
///     let reply = execute(&target, &commands::INFO).await?;
///     println!("{}", reply);
///     Ok(())
/// }
/// ```
pub async fn execute(target: &Target, command: &Command) -> Result<String> {
    LegacyTransport::new(target.clone()).send(command).await
}

/// A way of delivering commands to one device.
///
/// Device handles are generic over this so they can be driven by something
/// other than a socket in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a JSON command and returns the device's JSON reply.
    async fn send(&self, command: &Command) -> Result<String>;

    /// Returns the framing convention in use.
    fn mode(&self) -> Mode;

    /// Returns the device host.
    fn host(&self) -> &str;

    /// Returns the device port.
    fn port(&self) -> u16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = Target::new("10.0.0.5");
        assert_eq!(target.port, 9999);
        assert_eq!(target.mode, Mode::Tcp);
        assert_eq!(target.timeout, DEFAULT_TIMEOUT);
        assert_eq!(target.addr(), "10.0.0.5:9999");
    }

    #[test]
    fn test_target_builder() {
        let target = Target::new("plug.local")
            .with_port(10000)
            .with_mode(Mode::Udp)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(target.addr(), "plug.local:10000");
        assert_eq!(target.mode, Mode::Udp);
        assert_eq!(target.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_ipv6_addr_is_bracketed() {
        assert_eq!(Target::new("fe80::1").addr(), "[fe80::1]:9999");
    }
}
