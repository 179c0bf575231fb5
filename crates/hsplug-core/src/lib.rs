//! Core library for controlling TP-Link HS100, HS105 and HS110 smart plugs.
//!
//! The plugs speak the TP-Link Smart Home Protocol: JSON commands scrambled
//! with an XOR autokey cipher (initial key 171), sent over TCP port 9999
//! with a 4-byte big-endian length prefix, or as bare UDP datagrams.
//!
//! # Overview
//!
//! - [`crypto`] - the XOR autokey cipher
//! - [`frame`] - length-prefixed and bare wire framing
//! - [`transport`] - one request/response exchange under a single deadline
//! - [`commands`], [`response`], [`schedule`] - the JSON command catalog and
//!   typed replies
//! - [`device`], [`emeter`] - plug handles
//! - [`discovery`] - UDP broadcast discovery
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use hsplug_core::{Hs100, Plug};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hsplug_core::Error> {
//!     let plug = Hs100::new("192.168.1.100", Duration::from_secs(5));
//!     let info = plug.sysinfo().await?;
//!     println!("{} is {}", info.alias, if info.is_on() { "on" } else { "off" });
//!     plug.turn_off().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Protocol Details
//!
//! 1. Commands are JSON documents such as `{"system":{"get_sysinfo":{}}}`
//! 2. Each byte is XORed with the previous ciphertext byte, starting from 171
//! 3. Over TCP, the ciphertext length is prepended as a 4-byte big-endian integer
//! 4. The reply mirrors the request, with `err_code` 0 on success

pub mod commands;
pub mod crypto;
pub mod device;
pub mod discovery;
pub mod emeter;
pub mod error;
pub mod frame;
pub mod response;
pub mod schedule;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::Command;
pub use device::{Hs100, Hs105, Hs110, Plug};
pub use discovery::{
    DEFAULT_DISCOVERY_TIMEOUT, DISCOVERY_LISTEN_PORT, Device, Discovery, DiscoveryConfig, discover,
};
pub use emeter::Meter;
pub use error::{Error, Result};
pub use frame::Mode;
pub use transport::{DEFAULT_PORT, DEFAULT_TIMEOUT, Target, execute};

/// The version of the hsplug-core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
