//! Wire framing for Smart Home Protocol payloads.
//!
//! Over TCP every payload is preceded by its ciphertext length as a 4-byte
//! big-endian integer. UDP datagrams carry the ciphertext alone. Some early
//! firmware also speaks header-less TCP; that convention is never guessed
//! at, it has to be selected with [`Mode::TcpHeaderless`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    commands::Command,
    crypto::xor,
    error::{Error, Result},
};

/// Size of the TCP length header.
pub const HEADER_LEN: usize = 4;

/// Largest body the transport will accept.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Framing convention for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// TCP with a 4-byte big-endian length header.
    #[default]
    Tcp,
    /// TCP without a header; the peer closing the stream ends the reply.
    TcpHeaderless,
    /// One UDP datagram per message, no header.
    Udp,
}

impl Mode {
    /// Returns true if frames in this mode start with a length header.
    pub fn has_header(self) -> bool {
        matches!(self, Mode::Tcp)
    }

    /// Returns true if this mode runs over a TCP stream.
    pub fn is_stream(self) -> bool {
        matches!(self, Mode::Tcp | Mode::TcpHeaderless)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Tcp => write!(f, "tcp"),
            Mode::TcpHeaderless => write!(f, "tcp-headerless"),
            Mode::Udp => write!(f, "udp"),
        }
    }
}

/// Encodes `command` and frames it for `mode`.
///
/// # Example
///
/// ```
/// use hsplug_core::{commands, frame::{self, Mode}};
///
/// let frame = frame::build_frame(&commands::INFO, Mode::Tcp);
/// let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
/// assert_eq!(declared as usize, commands::INFO.as_str().len());
/// ```
pub fn build_frame(command: &Command, mode: Mode) -> Vec<u8> {
    let body = xor::encode(command.as_bytes());
    if !mode.has_header() {
        return body;
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Recovers the plaintext JSON from a received frame.
///
/// In [`Mode::Tcp`] the declared length must not exceed the bytes after the
/// header. A declared length shorter than the body is tolerated and the
/// whole body is decoded.
pub fn parse_frame(bytes: &[u8], mode: Mode) -> Result<String> {
    let body = if mode.has_header() {
        let header = bytes.first_chunk::<HEADER_LEN>().ok_or_else(|| {
            Error::Framing(format!(
                "frame of {} bytes is shorter than the length header",
                bytes.len()
            ))
        })?;
        let declared = declared_length(*header);
        let body = &bytes[HEADER_LEN..];
        if declared > body.len() {
            return Err(Error::Framing(format!(
                "header declares {} bytes but only {} arrived",
                declared,
                body.len()
            )));
        }
        body
    } else {
        bytes
    };

    String::from_utf8(xor::decode(body))
        .map_err(|e| Error::Framing(format!("payload is not UTF-8: {}", e)))
}

/// Reads the body length from a TCP header.
pub fn declared_length(header: [u8; HEADER_LEN]) -> usize {
    u32::from_be_bytes(header) as usize
}
