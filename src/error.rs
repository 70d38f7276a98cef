//! Error types for the SOCKS5 connection state machine.

use crate::reply::FailureKind;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end the handling of one client connection
#[derive(Error, Debug)]
pub enum Error {
    /// Client spoke a SOCKS version other than 5
    #[error("unsupported SOCKS version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// Malformed bytes on the wire
    #[error("protocol error: {0}")]
    Protocol(String),

    /// None of the offered methods is configured on the server
    #[error("no acceptable authentication method")]
    NoAcceptableAuthMethod,

    /// Username/password sub-negotiation rejected the client
    #[error("username/password authentication failed")]
    AuthenticationFailed,

    /// Request carried a command other than CONNECT
    #[error("command not supported: {0:#04x}")]
    CommandNotSupported(u8),

    /// Request carried an unknown ATYP tag
    #[error("address type not supported: {0:#04x}")]
    AddressTypeNotSupported(u8),

    /// Destination could not be dialed
    #[error("dial failed: {0}")]
    Dial(#[from] DialError),

    /// Credential store returned an error
    #[error("credential store error: {0:#}")]
    Store(anyhow::Error),

    /// Credential store did not answer before its deadline
    #[error("credential store timed out after {0:?}")]
    StoreTimeout(Duration),

    /// A single read or write exceeded its deadline
    #[error("i/o deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// Underlying stream error
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// failure_kind is the reply code owed to the client for this error, if
    /// the protocol still allows a reply when it happens
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::CommandNotSupported(_) => Some(FailureKind::CommandNotSupported),
            Error::AddressTypeNotSupported(_) => Some(FailureKind::AddressTypeNotSupported),
            Error::Dial(e) => Some(e.failure_kind()),
            _ => None,
        }
    }
}

/// Reasons a dial to the destination failed
#[derive(Error, Debug)]
pub enum DialError {
    /// Name resolution of a domain destination failed
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Name resolution succeeded but returned nothing
    #[error("no addresses found for {0}")]
    NoAddresses(String),

    /// The connect did not complete within the dial timeout
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The connect itself failed
    #[error(transparent)]
    Connect(#[from] io::Error),
}

impl DialError {
    /// failure_kind classifies the dial failure into the SOCKS5 reply vocabulary
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            DialError::Resolve { .. } | DialError::NoAddresses(_) | DialError::Timeout(_) => {
                FailureKind::HostUnreachable
            }
            DialError::Connect(e) => match e.kind() {
                io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
                io::ErrorKind::HostUnreachable => FailureKind::HostUnreachable,
                io::ErrorKind::NetworkUnreachable => FailureKind::NetworkUnreachable,
                io::ErrorKind::PermissionDenied => FailureKind::NotAllowed,
                _ => FailureKind::GeneralFailure,
            },
        }
    }
}
