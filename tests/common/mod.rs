#![allow(dead_code)]

use minisocks::{NoOutputLogger, Options, Socks5Server};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// spawn_echo_server binds addr and echoes every connection back to itself
pub async fn spawn_echo_server(addr: &str) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rd, mut wr) = stream.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });

    Ok(local)
}

/// spawn_proxy starts a proxy on an ephemeral loopback port
pub async fn spawn_proxy(opts: Options) -> SocketAddr {
    let opts = opts
        .with_listen_addr("127.0.0.1:0")
        .with_logger(Arc::new(NoOutputLogger));
    let mut server = Socks5Server::new(opts);
    let addr = server.bind().await.unwrap();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

/// greet offers methods and returns the one the proxy picked
pub async fn greet(stream: &mut TcpStream, methods: &[u8]) -> u8 {
    let mut msg = vec![0x05, methods.len() as u8];
    msg.extend_from_slice(methods);
    stream.write_all(&msg).await.unwrap();

    let mut resp = [0u8; 2];
    stream.read_exact(&mut resp).await.unwrap();
    assert_eq!(resp[0], 0x05);
    resp[1]
}

/// login runs the username/password sub-negotiation and returns STATUS
pub async fn login(stream: &mut TcpStream, username: &str, password: &str) -> u8 {
    let mut msg = vec![0x01, username.len() as u8];
    msg.extend_from_slice(username.as_bytes());
    msg.push(password.len() as u8);
    msg.extend_from_slice(password.as_bytes());
    stream.write_all(&msg).await.unwrap();

    let mut resp = [0u8; 2];
    stream.read_exact(&mut resp).await.unwrap();
    assert_eq!(resp[0], 0x01);
    resp[1]
}

/// connect_request builds a request for an IP destination
pub fn connect_request(cmd: u8, target: SocketAddr) -> Vec<u8> {
    let mut req = vec![0x05, cmd, 0x00];
    match target {
        SocketAddr::V4(addr) => {
            req.push(0x01);
            req.extend_from_slice(&addr.ip().octets());
        }
        SocketAddr::V6(addr) => {
            req.push(0x04);
            req.extend_from_slice(&addr.ip().octets());
        }
    }
    req.extend_from_slice(&target.port().to_be_bytes());
    req
}

/// domain_request builds a CONNECT request for a domain destination
pub fn domain_request(host: &str, port: u16) -> Vec<u8> {
    let mut req = vec![0x05, 0x01, 0x00, 0x03, host.len() as u8];
    req.extend_from_slice(host.as_bytes());
    req.extend_from_slice(&port.to_be_bytes());
    req
}

/// read_reply reads a full reply and returns (REP, ATYP)
pub async fn read_reply(stream: &mut TcpStream) -> (u8, u8) {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.unwrap();
    assert_eq!(head[0], 0x05);
    assert_eq!(head[2], 0x00);

    let rest = match head[3] {
        0x01 => 4 + 2,
        0x04 => 16 + 2,
        other => panic!("unexpected ATYP in reply: {other:#04x}"),
    };
    let mut tail = vec![0u8; rest];
    stream.read_exact(&mut tail).await.unwrap();

    (head[1], head[3])
}

/// send_request writes a request and reads the reply code
pub async fn send_request(stream: &mut TcpStream, req: &[u8]) -> u8 {
    stream.write_all(req).await.unwrap();
    read_reply(stream).await.0
}

/// assert_closed waits for the proxy to close the connection
pub async fn assert_closed(stream: &mut TcpStream) {
    let mut rest = Vec::new();
    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        stream.read_to_end(&mut rest),
    )
    .await
    .expect("proxy did not close the connection")
    .unwrap();
    assert!(rest.is_empty(), "unexpected trailing bytes: {rest:?}");
}

/// echo_roundtrip sends payload and expects it back unchanged
pub async fn echo_roundtrip(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, payload);
}
