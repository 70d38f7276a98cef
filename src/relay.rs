//! Bidirectional copy between the client and the dialed destination.

use crate::deadline::Deadlines;
use crate::error::{Error, Result};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinError;
use tracing::{debug, info};

const RELAY_BUF_SIZE: usize = 16 * 1024;

/// Transfer counts the bytes relayed in each direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub from_client: u64,
    pub from_destination: u64,
}

/// relay copies bytes both ways until either direction hits end-of-stream,
/// an I/O error or a deadline. Whichever direction ends first takes the
/// other down with it, and both streams are closed once this returns.
pub async fn relay<A, B>(client: A, destination: B, deadlines: Deadlines) -> Result<Transfer>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (dest_read, dest_write) = tokio::io::split(destination);

    let from_client = Arc::new(AtomicU64::new(0));
    let from_destination = Arc::new(AtomicU64::new(0));

    let mut upstream = tokio::spawn(copy_half(
        client_read,
        dest_write,
        deadlines,
        Arc::clone(&from_client),
    ));
    let mut downstream = tokio::spawn(copy_half(
        dest_read,
        client_write,
        deadlines,
        Arc::clone(&from_destination),
    ));

    let (up, down) = tokio::select! {
        res = &mut upstream => {
            debug!("client -> destination finished");
            downstream.abort();
            (res, downstream.await)
        }
        res = &mut downstream => {
            debug!("destination -> client finished");
            upstream.abort();
            (upstream.await, res)
        }
    };

    let transfer = Transfer {
        from_client: from_client.load(Ordering::Relaxed),
        from_destination: from_destination.load(Ordering::Relaxed),
    };

    info!(
        "connection closed: {} bytes from client, {} bytes from server",
        transfer.from_client, transfer.from_destination
    );

    join_outcome(up).and(join_outcome(down))?;
    Ok(transfer)
}

/// copy_half pumps one direction, renewing the deadline on every read and write
async fn copy_half<R, W>(
    mut reader: R,
    mut writer: W,
    deadlines: Deadlines,
    copied: Arc<AtomicU64>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUF_SIZE];
    loop {
        let n = deadlines.read(&mut reader, &mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        deadlines.write_all(&mut writer, &buf[..n]).await?;
        copied.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// join_outcome treats the aborted direction as a clean exit
fn join_outcome(res: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match res {
        Ok(res) => res,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(Error::Io(io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_relay_bidirectional() {
        let (mut client, client_side) = duplex(1024);
        let (mut dest, dest_side) = duplex(1024);

        let relay_handle =
            tokio::spawn(async move { relay(client_side, dest_side, Deadlines::default()).await });

        client.write_all(b"message A->B").await.unwrap();
        let mut buf = [0u8; 12];
        dest.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"message A->B");

        dest.write_all(b"message B->A!").await.unwrap();
        let mut buf = [0u8; 13];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"message B->A!");

        drop(client);
        let transfer = tokio::time::timeout(Duration::from_secs(1), relay_handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            transfer,
            Transfer {
                from_client: 12,
                from_destination: 13
            }
        );
    }

    #[tokio::test]
    async fn test_relay_destination_speaks_first() {
        let (mut client, client_side) = duplex(1024);
        let (mut dest, dest_side) = duplex(1024);

        let relay_handle =
            tokio::spawn(async move { relay(client_side, dest_side, Deadlines::default()).await });

        dest.write_all(b"220 banner\r\n").await.unwrap();
        let mut buf = [0u8; 12];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"220 banner\r\n");

        drop(dest);
        tokio::time::timeout(Duration::from_secs(1), relay_handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_relay_large_data() {
        let (mut client, client_side) = duplex(65536);
        let (mut dest, dest_side) = duplex(65536);

        let relay_handle =
            tokio::spawn(async move { relay(client_side, dest_side, Deadlines::default()).await });

        let large_data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let expected = large_data.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&large_data).await.unwrap();
            client
        });

        let mut received = vec![0u8; expected.len()];
        dest.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);

        drop(writer.await.unwrap());
        let transfer = tokio::time::timeout(Duration::from_secs(1), relay_handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(transfer.from_client, 200_000);
    }

    #[tokio::test]
    async fn test_relay_client_close_closes_destination() {
        let (client, client_side) = duplex(1024);
        let (mut dest, dest_side) = duplex(1024);

        let relay_handle =
            tokio::spawn(async move { relay(client_side, dest_side, Deadlines::default()).await });

        drop(client);

        // The destination sees end-of-stream once the relay tears down
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(1), dest.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(rest.is_empty());

        let result = tokio::time::timeout(Duration::from_secs(1), relay_handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_relay_idle_deadline() {
        let (_client, client_side) = duplex(1024);
        let (_dest, dest_side) = duplex(1024);
        let deadlines = Deadlines::new(Some(Duration::from_millis(50)), None);

        let err = tokio::time::timeout(
            Duration::from_secs(1),
            relay(client_side, dest_side, deadlines),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_relay_stalled_client_hits_write_deadline() {
        // The client never reads, so its pipe fills and writes to it block
        let (_client, client_side) = duplex(64);
        let (mut dest, dest_side) = duplex(65536);
        let deadlines = Deadlines::new(None, Some(Duration::from_millis(50)));

        tokio::spawn(async move {
            let _ = dest.write_all(&vec![0x42u8; 100 * 1024]).await;
        });

        let err = tokio::time::timeout(
            Duration::from_secs(1),
            relay(client_side, dest_side, deadlines),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
    }
}
