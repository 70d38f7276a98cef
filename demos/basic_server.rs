//! Basic SOCKS5 server example

use minisocks::{Options, Socks5Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut server = Socks5Server::new(Options::default());
    println!("Starting SOCKS5 server on {}", server.listen_addr);

    server.run().await
}
