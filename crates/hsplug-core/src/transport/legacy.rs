//! Socket transport for the XOR-obfuscated Smart Home Protocol.
//!
//! - TCP on port 9999, with or without the 4-byte length header
//! - UDP on port 9999, one datagram each way, to a unicast or broadcast address
//! - No authentication

use std::{future::Future, io::ErrorKind, net::SocketAddr};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, UdpSocket, lookup_host},
    time::{Instant, timeout_at},
};
use tracing::debug;

use crate::{
    commands::Command,
    error::{Error, Result},
    frame::{self, HEADER_LEN, MAX_FRAME_LEN, Mode},
    transport::{Target, Transport},
};

/// Largest UDP reply we read.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Transport using the XOR protocol over plain sockets.
///
/// # Example
///
/// ```no_run
/// use hsplug_core::{commands, transport::{LegacyTransport, Target, Transport}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = LegacyTransport::new(Target::new("192.168.1.100"));
///     let response = transport.send(&commands::INFO).await?;
///     println!("{}", response);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LegacyTransport {
    target: Target,
}

/// Runs `fut` unless `deadline` passes first.
async fn before<F: Future>(
    deadline: Instant,
    what: impl FnOnce() -> String,
    fut: F,
) -> Result<F::Output> {
    timeout_at(deadline, fut)
        .await
        .map_err(|_| Error::Timeout(what()))
}

impl LegacyTransport {
    /// Creates a transport for `target`.
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    /// The configured target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    async fn send_command(&self, command: &Command) -> Result<String> {
        let deadline = Instant::now() + self.target.timeout;
        let request = frame::build_frame(command, self.target.mode);

        let reply = if self.target.mode.is_stream() {
            self.exchange_tcp(&request, deadline).await?
        } else {
            self.exchange_udp(&request, deadline).await?
        };

        frame::parse_frame(&reply, self.target.mode)
    }

    async fn exchange_tcp(&self, request: &[u8], deadline: Instant) -> Result<Vec<u8>> {
        let addr = self.target.addr();
        debug!(addr = %addr, mode = %self.target.mode, "connecting");

        let mut stream = before(
            deadline,
            || format!("connecting to {}", addr),
            TcpStream::connect(&addr),
        )
        .await??;

        debug!(addr = %addr, bytes = request.len(), "sending request");
        before(deadline, || "writing request".into(), stream.write_all(request)).await??;

        let reply = match self.target.mode {
            Mode::Tcp => read_framed(&mut stream, deadline).await?,
            _ => {
                // Without a header the device only knows the request is
                // complete once our write half is closed.
                before(deadline, || "closing request".into(), stream.shutdown()).await??;
                read_to_close(&mut stream, deadline).await?
            }
        };

        debug!(addr = %addr, bytes = reply.len(), "received response");
        Ok(reply)
    }

    async fn exchange_udp(&self, request: &[u8], deadline: Instant) -> Result<Vec<u8>> {
        let addr = self.target.addr();
        let peer = before(deadline, || format!("resolving {}", addr), lookup_host(&addr))
            .await??
            .next()
            .ok_or_else(|| {
                Error::Connection(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("{} did not resolve to an address", addr),
                ))
            })?;

        let local: SocketAddr = if peer.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        if peer.is_ipv4() {
            socket.set_broadcast(true)?;
        }

        debug!(addr = %peer, bytes = request.len(), "sending datagram");
        before(deadline, || "sending datagram".into(), socket.send_to(request, peer)).await??;

        // Not connected: a broadcast is answered from the plug's own address.
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = before(
            deadline,
            || format!("waiting for a reply from {}", peer),
            socket.recv_from(&mut buf),
        )
        .await??;
        buf.truncate(n);

        debug!(addr = %from, bytes = n, "received datagram");
        Ok(buf)
    }
}

/// Reads the length header and then the declared body.
///
/// If the peer closes early the short frame is handed back as-is and the
/// codec rejects it.
async fn read_framed(stream: &mut TcpStream, deadline: Instant) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_LEN];
    before(deadline, || "reading length header".into(), stream.read_exact(&mut header))
        .await?
        .map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                Error::Framing("connection closed before the length header".into())
            }
            _ => Error::Connection(e),
        })?;

    let declared = frame::declared_length(header);
    debug!(payload_bytes = declared, "response payload length");
    if declared > MAX_FRAME_LEN {
        return Err(Error::Framing(format!(
            "response too large: {} bytes",
            declared
        )));
    }

    let mut reply = Vec::with_capacity(HEADER_LEN + declared);
    reply.extend_from_slice(&header);
    before(
        deadline,
        || "reading response body".into(),
        stream.take(declared as u64).read_to_end(&mut reply),
    )
    .await??;

    Ok(reply)
}

/// Reads until the peer closes the stream.
async fn read_to_close(stream: &mut TcpStream, deadline: Instant) -> Result<Vec<u8>> {
    let mut reply = Vec::new();
    before(
        deadline,
        || "reading response".into(),
        stream.take(MAX_FRAME_LEN as u64 + 1).read_to_end(&mut reply),
    )
    .await??;

    if reply.len() > MAX_FRAME_LEN {
        return Err(Error::Framing(format!(
            "response exceeds {} bytes",
            MAX_FRAME_LEN
        )));
    }
    Ok(reply)
}

#[async_trait]
impl Transport for LegacyTransport {
    async fn send(&self, command: &Command) -> Result<String> {
        self.send_command(command).await
    }

    fn mode(&self) -> Mode {
        self.target.mode
    }

    fn host(&self) -> &str {
        &self.target.host
    }

    fn port(&self) -> u16 {
        self.target.port
    }
}
