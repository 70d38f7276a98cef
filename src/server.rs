use crate::{
    auth, commands,
    config::{Options, Settings},
    driver::Listener,
    relay,
};
use anyhow::{Context, Result, bail};
use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

/// pause after a transient accept error, e.g. running out of descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Socks5Server represents a SOCKS5 server and houses related
/// configuration data
pub struct Socks5Server {
    pub listen_addr: String,
    settings: Arc<Settings>,
    listener: Option<Box<dyn Listener>>,
}

/// Socks5Server implementation block
impl Socks5Server {
    /// new is a constructor for the Socks5Server type
    pub fn new(options: Options) -> Self {
        Self {
            listen_addr: options.listen_addr.clone(),
            settings: Arc::new(Settings::from(options)),
            listener: None,
        }
    }

    /// bind opens the listener through the configured driver and returns
    /// the address it is bound to
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        if self.listener.is_some() {
            bail!("bind can only be called once");
        }

        let listener = self
            .settings
            .driver
            .listen()
            .await
            .with_context(|| format!("failed to listen on {}", self.listen_addr))?;
        let addr = listener.local_addr()?;

        info!("SOCKS5 proxy listening on {addr}");

        self.listener = Some(listener);
        Ok(addr)
    }

    /// run serves clients until the listener fails
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// run_until serves clients until shutdown resolves. Connections already
    /// accepted keep running to completion.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.listener.is_none() {
            self.bind().await?;
        }
        let Some(mut listener) = self.listener.take() else {
            bail!("listener is not bound");
        };

        serve(&mut *listener, Arc::clone(&self.settings), shutdown).await
    }
}

/// serve accepts connections in a loop and spawns one task per client
pub async fn serve<F>(
    listener: &mut dyn Listener,
    settings: Arc<Settings>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down: no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                let settings = Arc::clone(&settings);

                tokio::spawn(async move {
                    debug!("new client: {peer_addr}");

                    if let Err(e) = handle_connection(stream, &settings).await {
                        settings
                            .logger
                            .error(format_args!("connection error from {peer_addr}: {e}"));
                    }
                });
            }
            Err(e) if is_transient_accept_error(&e) => {
                settings
                    .logger
                    .error(format_args!("accept failed, retrying: {e}"));
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
            Err(e) => return Err(e).context("listener closed"),
        }
    }
}

/// handle_connection handles the full client/server SOCKS5 protocol flow.
/// The client stream, and the destination once dialed, are closed when this
/// returns, whatever the outcome.
pub async fn handle_connection<S>(mut stream: S, settings: &Settings) -> crate::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Negotiate authentication with client
    let method = auth::negotiate_auth(&mut stream, settings).await?;
    debug!("authenticated with {method:?}");

    // Handle connection request from client
    let outbound = commands::handle_socks_request(&mut stream, settings).await?;

    // Proxy
    relay::relay(stream, outbound.stream, settings.deadlines).await?;

    Ok(())
}

/// is_transient_accept_error tells a failed accept apart from a dead listener
fn is_transient_accept_error(e: &io::Error) -> bool {
    !matches!(
        e.kind(),
        io::ErrorKind::NotConnected
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Unsupported
    )
}
