//! Local-network discovery of HS1xx plugs.
//!
//! A single get-sysinfo probe is broadcast as a bare UDP frame to port 9999.
//! Every plug that hears it answers with its sysinfo, also as a bare frame.
//! Collection runs until the configured deadline; there is no count limit.

use std::{
    collections::HashSet,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    net::UdpSocket,
    time::{Instant, timeout_at},
};
use tracing::debug;

use crate::{
    commands,
    error::{Error, Result},
    frame::{self, Mode},
    response::{self, SysInfo},
    transport::DEFAULT_PORT,
};

/// Local port discovery listens on by default.
pub const DISCOVERY_LISTEN_PORT: u16 = 8755;

/// Default time to wait for replies.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest reply datagram we read.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Where to probe and how long to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Local address to bind. Port 0 picks an ephemeral port.
    pub listen: SocketAddr,
    /// Where the probe is sent, normally the limited broadcast address.
    pub target: SocketAddr,
    /// How long to collect replies.
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listen: (Ipv4Addr::UNSPECIFIED, DISCOVERY_LISTEN_PORT).into(),
            target: (Ipv4Addr::BROADCAST, DEFAULT_PORT).into(),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    /// Sets the local bind address.
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Sets the probe destination, e.g. a subnet broadcast address.
    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    /// Sets how long to collect replies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A plug that answered the probe.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// Source address of the reply.
    pub addr: SocketAddr,
    /// The sysinfo it sent back.
    pub info: SysInfo,
}

/// Outcome of one discovery round.
#[derive(Debug, Default)]
pub struct Discovery {
    /// One entry per distinct responding address, in arrival order.
    pub devices: Vec<Device>,
    /// Replies that could not be decoded or parsed, and receive errors
    /// (reported against the probe destination).
    pub rejected: Vec<(SocketAddr, Error)>,
}

impl Discovery {
    /// Returns true if nothing answered at all.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.rejected.is_empty()
    }

    fn record_reply(&mut self, from: SocketAddr, datagram: &[u8]) {
        match parse_reply(datagram) {
            Ok(info) => self.devices.push(Device { addr: from, info }),
            Err(e) => {
                debug!(addr = %from, error = %e, "unusable discovery reply");
                self.rejected.push((from, e));
            }
        }
    }

    fn record_receive_error(&mut self, target: SocketAddr, err: std::io::Error) {
        self.rejected.push((target, Error::Connection(err)));
    }
}

/// Broadcasts a sysinfo probe and collects replies until the deadline.
///
/// No replies is not an error: the result is simply empty.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use hsplug_core::discovery::{DiscoveryConfig, discover};
///
/// #[tokio::main]
/// async fn main() -> Result<(), hsplug_core::Error> {
///     let config = DiscoveryConfig::default().with_timeout(Duration::from_secs(2));
///     for device in discover(&config).await?.devices {
///         println!("{} {}", device.addr, device.info.alias);
///     }
///     Ok(())
/// }
/// ```
pub async fn discover(config: &DiscoveryConfig) -> Result<Discovery> {
    let deadline = Instant::now() + config.timeout;

    let socket = UdpSocket::bind(config.listen).await?;
    socket.set_broadcast(true)?;

    let probe = frame::build_frame(&commands::INFO, Mode::Udp);
    debug!(dest = %config.target, bytes = probe.len(), "sending discovery probe");
    socket.send_to(&probe, config.target).await?;

    let mut found = Discovery::default();
    let mut seen = HashSet::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (n, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                // e.g. an ICMP unreachable surfacing on Windows; later
                // replies can still arrive.
                debug!(error = %e, "discovery receive failed");
                found.record_receive_error(config.target, e);
                continue;
            }
            Err(_) => {
                debug!("discovery deadline reached");
                break;
            }
        };

        if !seen.insert(from) {
            debug!(addr = %from, "ignoring repeated reply");
            continue;
        }
        debug!(addr = %from, bytes = n, "discovery reply");
        found.record_reply(from, &buf[..n]);
    }

    debug!(
        devices = found.devices.len(),
        rejected = found.rejected.len(),
        "discovery finished"
    );
    Ok(found)
}

fn parse_reply(datagram: &[u8]) -> Result<SysInfo> {
    let json = frame::parse_frame(datagram, Mode::Udp)?;
    response::extract(&json, "system", "get_sysinfo")
}
