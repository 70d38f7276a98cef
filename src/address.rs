use crate::deadline::Deadlines;
use crate::error::{Error, Result};
use crate::protocol::AddressType;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use tokio::io::{AsyncRead, AsyncWrite};

/// Address is the ATYP / ADDR / PORT triplet shared by requests and replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    IPv4(SocketAddrV4),
    DomainName(String, u16),
    IPv6(SocketAddrV6),
}

impl Address {
    /// unspecified is the 0.0.0.0:0 bound address sent with failure replies
    pub fn unspecified() -> Self {
        Address::IPv4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }

    pub fn address_type(&self) -> AddressType {
        match self {
            Address::IPv4(_) => AddressType::IPv4,
            Address::DomainName(..) => AddressType::DomainName,
            Address::IPv6(_) => AddressType::IPv6,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::IPv4(addr) => addr.port(),
            Address::DomainName(_, port) => *port,
            Address::IPv6(addr) => addr.port(),
        }
    }

    /// read_from parses an address from the stream, starting at the ATYP byte
    pub async fn read_from<R>(stream: &mut R, deadlines: &Deadlines) -> Result<Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let atyp = deadlines.read_u8(stream).await?;
        let addr_type = AddressType::from_byte(atyp).ok_or(Error::AddressTypeNotSupported(atyp))?;

        let address = match addr_type {
            AddressType::IPv4 => {
                // 4 address octets + 2 port octets
                let mut buf = [0u8; 6];
                deadlines.read_exact(stream, &mut buf).await?;
                let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
                Address::IPv4(SocketAddrV4::new(ip, u16::from_be_bytes([buf[4], buf[5]])))
            }
            AddressType::DomainName => {
                // First octet in DomainName contains the number of
                // octets to follow
                let len = deadlines.read_u8(stream).await? as usize;
                if len == 0 {
                    return Err(Error::Protocol("domain length cannot be 0".into()));
                }

                let mut buf = vec![0u8; len + 2];
                deadlines.read_exact(stream, &mut buf).await?;
                let port = u16::from_be_bytes([buf[len], buf[len + 1]]);
                buf.truncate(len);

                let domain = String::from_utf8(buf)
                    .map_err(|e| Error::Protocol(format!("invalid domain: {e}")))?;
                Address::DomainName(domain, port)
            }
            AddressType::IPv6 => {
                // 16 address octets + 2 port octets
                let mut buf = [0u8; 18];
                deadlines.read_exact(stream, &mut buf).await?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[..16]);
                let port = u16::from_be_bytes([buf[16], buf[17]]);
                Address::IPv6(SocketAddrV6::new(Ipv6Addr::from(octets), port, 0, 0))
            }
        };

        Ok(address)
    }

    /// encode_into appends the wire form of the address to buf
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(self.address_type() as u8);
        match self {
            Address::IPv4(addr) => buf.extend_from_slice(&addr.ip().octets()),
            Address::DomainName(domain, _) => {
                let len = u8::try_from(domain.len()).map_err(|_| {
                    Error::Protocol(format!(
                        "domain name too long: {} (max 255 bytes)",
                        domain.len()
                    ))
                })?;
                buf.push(len);
                buf.extend_from_slice(domain.as_bytes());
            }
            Address::IPv6(addr) => buf.extend_from_slice(&addr.ip().octets()),
        }
        buf.extend_from_slice(&self.port().to_be_bytes());
        Ok(())
    }

    /// write_to serializes the address onto the stream
    pub async fn write_to<W>(&self, stream: &mut W, deadlines: &Deadlines) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = Vec::with_capacity(22);
        self.encode_into(&mut buf)?;
        deadlines.write_all(stream, &buf).await
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(addr) => Address::IPv4(addr),
            SocketAddr::V6(addr) => Address::IPv6(addr),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::IPv4(addr) => write!(f, "{addr}"),
            Address::DomainName(domain, port) => write!(f, "{domain}:{port}"),
            Address::IPv6(addr) => write!(f, "{addr}"),
        }
    }
}
