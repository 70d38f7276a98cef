use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Deadlines holds the per-operation read and write timeouts.
///
/// Every single read or write gets a fresh timer, so a slow transfer that
/// keeps making progress is never cut off. `None` waits forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadlines {
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

impl Deadlines {
    pub fn new(read: Option<Duration>, write: Option<Duration>) -> Self {
        Self { read, write }
    }

    /// read_exact fills buf completely or fails
    pub async fn read_exact<R>(&self, reader: &mut R, buf: &mut [u8]) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        with_deadline(self.read, reader.read_exact(buf)).await?;
        Ok(())
    }

    /// read_u8 reads one byte
    pub async fn read_u8<R>(&self, reader: &mut R) -> Result<u8>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut byte = [0u8; 1];
        self.read_exact(reader, &mut byte).await?;
        Ok(byte[0])
    }

    /// read performs a single read, returning 0 on end-of-stream
    pub async fn read<R>(&self, reader: &mut R, buf: &mut [u8]) -> Result<usize>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        with_deadline(self.read, reader.read(buf)).await
    }

    /// write_all writes and flushes buf under one write deadline
    pub async fn write_all<W>(&self, writer: &mut W, buf: &[u8]) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        with_deadline(self.write, async {
            writer.write_all(buf).await?;
            writer.flush().await
        })
        .await
    }
}

async fn with_deadline<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(res) => res.map_err(Error::from),
            Err(_) => Err(Error::Timeout(limit)),
        },
        None => fut.await.map_err(Error::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_read_exact_within_deadline() {
        let (mut client, mut server) = duplex(64);
        let deadlines = Deadlines::new(Some(Duration::from_secs(1)), None);

        client.write_all(&[1, 2, 3]).await.unwrap();

        let mut buf = [0u8; 3];
        deadlines.read_exact(&mut server, &mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_read_deadline_expires() {
        let (_client, mut server) = duplex(64);
        let deadlines = Deadlines::new(Some(Duration::from_millis(20)), None);

        let mut buf = [0u8; 1];
        let err = deadlines.read_exact(&mut server, &mut buf).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_write_deadline_expires() {
        // Nobody drains the peer, so the second write cannot complete
        let (_client, mut server) = duplex(8);
        let deadlines = Deadlines::new(None, Some(Duration::from_millis(20)));

        deadlines.write_all(&mut server, &[0u8; 8]).await.unwrap();
        let err = deadlines.write_all(&mut server, &[0u8; 8]).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_deadline_renews_per_read() {
        let (mut client, mut server) = duplex(64);
        let deadlines = Deadlines::new(Some(Duration::from_millis(100)), None);

        // Total transfer time exceeds one deadline, each gap does not
        let writer = tokio::spawn(async move {
            for b in 0..4u8 {
                tokio::time::sleep(Duration::from_millis(40)).await;
                client.write_all(&[b]).await.unwrap();
            }
            client
        });

        for expected in 0..4u8 {
            assert_eq!(deadlines.read_u8(&mut server).await.unwrap(), expected);
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_eof_without_deadline() {
        let (client, mut server) = duplex(64);
        drop(client);

        let mut buf = [0u8; 8];
        let n = Deadlines::default().read(&mut server, &mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
