//! A lightweight SOCKS5 proxy library
//!
//! ## SOCKS5 Implementation
//!
//! - Features:
//!     - CONNECT over IPv4, IPv6 and domain names
//!     - No Authentication
//!     - Username/Password Authentication against a pluggable credential store
//!     - Per-read / per-write deadlines on every stage of a connection
//!     - Pluggable transport (listen + dial) and error logger
//!     - Async using tokio, one task per client
//! - [SOCKS5 (RFC 1928)](https://datatracker.ietf.org/doc/html/rfc1928)
//! - [Username/Password Authentication (RFC 1929)](https://datatracker.ietf.org/doc/html/rfc1929)
//!
//! # Example
//! ```no_run
//! use minisocks::{Options, Socks5Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let opts = Options::default()
//!         .with_listen_addr("127.0.0.1:1080")
//!         .with_user_pass_auth(true);
//!     let mut server = Socks5Server::new(opts);
//!     server.run().await
//! }
//! ```

pub mod address;
pub mod auth;
pub mod commands;
pub mod config;
pub mod deadline;
pub mod driver;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod relay;
pub mod reply;
pub mod server;
pub mod store;

// Re-export main types at crate root for convenience
pub use address::Address;
pub use config::Options;
pub use driver::{Driver, Listener, TcpDriver};
pub use error::{DialError, Error, Result};
pub use logger::{Logger, NoOutputLogger, TracingLogger};
pub use protocol::{AuthMethod, Command, Version};
pub use reply::{FailureKind, ReplyOutcome};
pub use server::Socks5Server;
pub use store::{CredentialStore, Credentials, StaticStore};
