//! Transport used to accept clients and dial destinations.
//!
//! The connection state machine only sees [`BoxStream`]s, so a [`Driver`] can
//! hand it plain TCP, TLS-wrapped sockets or in-memory pipes.

use crate::address::Address;
use crate::error::DialError;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, lookup_host};
use tracing::debug;

/// AsyncStream is any bidirectional byte stream the server can drive
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxStream = Box<dyn AsyncStream>;

/// Outbound is a freshly dialed destination connection
pub struct Outbound {
    pub stream: BoxStream,
    /// local end of the destination connection, reported as BND.ADDR
    pub local_addr: SocketAddr,
}

/// Listener yields accepted client connections
#[async_trait]
pub trait Listener: Send {
    async fn accept(&mut self) -> io::Result<(BoxStream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Listener for TcpListener {
    async fn accept(&mut self) -> io::Result<(BoxStream, SocketAddr)> {
        let (stream, peer_addr) = TcpListener::accept(self).await?;
        Ok((Box::new(stream), peer_addr))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Driver opens the listener and dials destinations. It is shared by all
/// connections and must support concurrent dials.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn listen(&self) -> io::Result<Box<dyn Listener>>;

    /// dial connects to target, resolving domain names itself
    async fn dial(
        &self,
        target: &Address,
        timeout: Option<Duration>,
    ) -> Result<Outbound, DialError>;
}

/// TcpDriver is the default plain TCP transport
#[derive(Debug, Clone)]
pub struct TcpDriver {
    listen_addr: String,
}

impl TcpDriver {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
        }
    }
}

#[async_trait]
impl Driver for TcpDriver {
    async fn listen(&self) -> io::Result<Box<dyn Listener>> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        Ok(Box::new(listener))
    }

    async fn dial(
        &self,
        target: &Address,
        timeout: Option<Duration>,
    ) -> Result<Outbound, DialError> {
        // The timeout covers name resolution as well as the connect
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, connect_any(target))
                .await
                .map_err(|_| DialError::Timeout(limit))??,
            None => connect_any(target).await?,
        };

        let local_addr = stream.local_addr()?;
        Ok(Outbound {
            stream: Box::new(stream),
            local_addr,
        })
    }
}

/// connect_any tries every resolved address of target in order and returns
/// the first connection that succeeds
async fn connect_any(target: &Address) -> Result<TcpStream, DialError> {
    let candidates: Vec<SocketAddr> = match target {
        Address::IPv4(addr) => vec![SocketAddr::V4(*addr)],
        Address::IPv6(addr) => vec![SocketAddr::V6(*addr)],
        Address::DomainName(host, port) => lookup_host((host.as_str(), *port))
            .await
            .map_err(|source| DialError::Resolve {
                host: host.clone(),
                source,
            })?
            .collect(),
    };

    let mut last_err = None;
    for addr in candidates {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => DialError::Connect(e),
        None => DialError::NoAddresses(target.to_string()),
    })
}
