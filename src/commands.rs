use crate::address::Address;
use crate::config::Settings;
use crate::deadline::Deadlines;
use crate::driver::Outbound;
use crate::error::{Error, Result};
use crate::protocol::{Command, RSV, Version};
use crate::reply::{ReplyOutcome, send_reply};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Request is a parsed client connection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub destination: Address,
}

/// read_request reads a full SOCKS5 request. The destination is consumed
/// before the command is checked so an unsupported command still leaves the
/// stream drained for its reply.
pub async fn read_request<R>(stream: &mut R, deadlines: &Deadlines) -> Result<Request>
where
    R: AsyncRead + Unpin + ?Sized,
{
    // SOCKS5 request format
    // +----+-----+-------+------+----------+----------+
    // |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    // +----+-----+-------+------+----------+----------+
    // | 1  |  1  | X'00' |  1   | Variable |    2     |
    // +----+-----+-------+------+----------+----------+
    let mut header = [0u8; 3];
    deadlines.read_exact(stream, &mut header).await?;

    let version = header[0];
    let command = header[1];
    let reserved = header[2];

    if version != Version::SOCKS5 as u8 {
        return Err(Error::UnsupportedVersion(version));
    }

    if reserved != RSV {
        return Err(Error::Protocol(format!(
            "reserved byte must be 0x00, got {reserved:#04x}"
        )));
    }

    let destination = Address::read_from(stream, deadlines).await?;

    match Command::from_byte(command) {
        Some(Command::Connect) => Ok(Request {
            command: Command::Connect,
            destination,
        }),
        // BIND and UDP ASSOCIATE are not served
        _ => Err(Error::CommandNotSupported(command)),
    }
}

/// handle_socks_request reads the client's request, dials the destination and
/// writes the reply. Every path that can still be answered gets exactly one
/// reply; only a successful dial returns the outbound stream.
pub async fn handle_socks_request<S>(stream: &mut S, settings: &Settings) -> Result<Outbound>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let deadlines = &settings.deadlines;

    let request = match read_request(stream, deadlines).await {
        Ok(request) => request,
        Err(e) => return Err(reply_failure(stream, deadlines, e).await),
    };

    debug!("CONNECT {}", request.destination);

    match settings
        .driver
        .dial(&request.destination, settings.dial_timeout)
        .await
    {
        Ok(outbound) => {
            send_reply(stream, &ReplyOutcome::Succeeded(outbound.local_addr), deadlines).await?;
            debug!(
                "connected to {} via {}",
                request.destination, outbound.local_addr
            );
            Ok(outbound)
        }
        Err(e) => Err(reply_failure(stream, deadlines, Error::Dial(e)).await),
    }
}

/// reply_failure sends the reply code matching err, when there is one, and
/// hands back the error that ends the connection
async fn reply_failure<S>(stream: &mut S, deadlines: &Deadlines, err: Error) -> Error
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let Some(kind) = err.failure_kind() else {
        return err;
    };

    if let Err(write_err) = send_reply(stream, &ReplyOutcome::Failure(kind), deadlines).await {
        debug!("failed to send {kind:?} reply: {write_err}");
    }
    err
}
