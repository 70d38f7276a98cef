use crate::address::Address;
use crate::deadline::Deadlines;
use crate::error::Result;
use crate::protocol::{RSV, Version};
use std::net::SocketAddr;
use tokio::io::AsyncWrite;

/// FailureKind lists the failure reply codes of RFC 1928 section 6
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    GeneralFailure = 0x01,
    NotAllowed = 0x02,
    NetworkUnreachable = 0x03,
    HostUnreachable = 0x04,
    ConnectionRefused = 0x05,
    TtlExpired = 0x06,
    CommandNotSupported = 0x07,
    AddressTypeNotSupported = 0x08,
    // 0x09 - 0xFF: unassigned
}

/// ReplyOutcome is the result of a request, as reported to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Succeeded(SocketAddr),
    Failure(FailureKind),
}

impl ReplyOutcome {
    /// code returns the REP byte
    pub fn code(&self) -> u8 {
        match self {
            ReplyOutcome::Succeeded(_) => 0x00,
            ReplyOutcome::Failure(kind) => *kind as u8,
        }
    }

    /// bound_address is the dialed local address on success, 0.0.0.0:0 otherwise
    pub fn bound_address(&self) -> Address {
        match self {
            ReplyOutcome::Succeeded(addr) => Address::from(*addr),
            ReplyOutcome::Failure(_) => Address::unspecified(),
        }
    }

    /// encode builds the full reply message
    pub fn encode(&self) -> Result<Vec<u8>> {
        // SOCKS5 reply format
        // +----+-----+-------+------+----------+----------+
        // |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
        // +----+-----+-------+------+----------+----------+
        // | 1  |  1  | X'00' |  1   | Variable |    2     |
        // +----+-----+-------+------+----------+----------+
        let mut reply = vec![Version::SOCKS5 as u8, self.code(), RSV];
        self.bound_address().encode_into(&mut reply)?;
        Ok(reply)
    }
}

/// send_reply writes the reply in one write so it is on the wire before
/// any relayed byte
pub async fn send_reply<W>(
    stream: &mut W,
    outcome: &ReplyOutcome,
    deadlines: &Deadlines,
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let reply = outcome.encode()?;
    deadlines.write_all(stream, &reply).await
}
