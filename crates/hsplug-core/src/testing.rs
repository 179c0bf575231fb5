//! In-process fake plugs for socket tests.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
};

use crate::{
    crypto::xor,
    frame::{self, HEADER_LEN, Mode},
};

pub const SYSINFO_REPLY: &str = r#"{"system":{"get_sysinfo":{"err_code":0,"sw_ver":"1.0.8 Build 151101 Rel.24452","hw_ver":"1.0","type":"smartplug","model":"HS110(EU)","mac":"50:C7:BF:00:C4:D0","deviceId":"80067B24A755F99C4D6C1807455E09F91AB7B2AA","alias":"Mobile","relay_state":1,"on_time":31,"feature":"TIM:ENE","rssi":-46,"led_off":0}}}"#;

/// Frames an arbitrary reply string, valid JSON or not.
pub fn encode_reply(reply: &str, mode: Mode) -> Vec<u8> {
    let body = xor::encode(reply.as_bytes());
    if !mode.has_header() {
        return body;
    }
    let mut out = (body.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&body);
    out
}

async fn read_request(stream: &mut TcpStream, mode: Mode) -> String {
    let mut bytes = Vec::new();
    if mode.has_header() {
        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header).await.unwrap();
        bytes.extend_from_slice(&header);
        let mut body = vec![0u8; frame::declared_length(header)];
        stream.read_exact(&mut body).await.unwrap();
        bytes.extend_from_slice(&body);
    } else {
        stream.read_to_end(&mut bytes).await.unwrap();
    }
    frame::parse_frame(&bytes, mode).unwrap()
}

/// A TCP plug that answers every request with `handler(request)`.
pub async fn tcp_device<F>(mode: Mode, handler: F) -> SocketAddr
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    tcp_raw_device_in(mode, move |request| encode_reply(&handler(request), mode)).await
}

/// A TCP plug (length-prefixed requests) that writes raw bytes back.
pub async fn tcp_raw_device<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    tcp_raw_device_in(Mode::Tcp, handler).await
}

async fn tcp_raw_device_in<F>(mode: Mode, handler: F) -> SocketAddr
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let request = read_request(&mut stream, mode).await;
                let reply = (*handler)(&request);
                let _ = stream.write_all(&reply).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// A TCP plug that accepts connections and never answers.
pub async fn tcp_silent_device() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn unused_tcp_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A UDP plug that answers each datagram with `handler(request)`.
pub async fn udp_device<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    udp_device_repeating(1, handler).await
}

/// A UDP plug that sends `copies` identical answers per datagram.
pub async fn udp_device_repeating<F>(copies: usize, handler: F) -> SocketAddr
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        while let Ok((n, from)) = socket.recv_from(&mut buf).await {
            let request = frame::parse_frame(&buf[..n], Mode::Udp).unwrap();
            let reply = encode_reply(&handler(&request), Mode::Udp);
            for _ in 0..copies {
                let _ = socket.send_to(&reply, from).await;
            }
        }
    });

    addr
}

/// A UDP socket that swallows everything sent to it.
pub async fn udp_silent_device() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        while socket.recv_from(&mut buf).await.is_ok() {}
    });

    addr
}
