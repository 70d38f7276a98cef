use anyhow::{Result, bail};
use clap::Parser;
use minisocks::{Credentials, NoOutputLogger, Options, Socks5Server};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "A lightweight SOCKS5 proxy", long_about = None)]
struct Args {
    /// Listener address
    #[arg(short, long, default_value = "127.0.0.1:1080")]
    listen: String,

    /// Deadline for each read from a client or destination (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    read_timeout: Option<Duration>,

    /// Deadline for each write to a client or destination
    #[arg(long, value_parser = humantime::parse_duration)]
    write_timeout: Option<Duration>,

    /// Timeout for connecting to a destination
    #[arg(long, value_parser = humantime::parse_duration)]
    dial_timeout: Option<Duration>,

    /// Deadline for a credential lookup
    #[arg(long, value_parser = humantime::parse_duration, default_value = "15s")]
    store_timeout: Duration,

    /// Require username/password authentication with the built-in account
    #[arg(long, action)]
    auth: bool,

    /// Username for SOCKS5 proxy
    #[arg(short, long)]
    username: Option<String>,

    /// Password for SOCKS5 proxy
    #[arg(short, long)]
    password: Option<String>,

    /// Do not report connection errors
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Initialize tracing subscriber
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let mut opts = Options::default()
        .with_listen_addr(args.listen)
        .with_read_timeout(args.read_timeout)
        .with_write_timeout(args.write_timeout)
        .with_dial_timeout(args.dial_timeout)
        .with_store_timeout(args.store_timeout)
        .with_user_pass_auth(args.auth);

    // Check for auth and grab it if present
    match (args.username, args.password) {
        (Some(u), Some(p)) => {
            opts = opts
                .with_user_pass_auth(true)
                .with_static_credentials([Credentials::new(u, p)]);
        }
        (None, None) => {
            if args.auth {
                warn!("Authentication enabled with the built-in account");
            }
        }
        _ => bail!("[ERR] must provide both username and password (or neither)"),
    }

    if opts.user_pass_auth {
        info!("Authentication enabled");
    }

    if args.quiet {
        opts = opts.with_logger(Arc::new(NoOutputLogger));
    }

    // Instantiate server
    let mut server = Socks5Server::new(opts);

    // Run it
    info!("Starting SOCKS5 proxy: {}", server.listen_addr);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
}
