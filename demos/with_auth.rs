//! SOCKS5 server with username/password authentication backed by a custom store

use async_trait::async_trait;
use minisocks::{CredentialStore, Options, Socks5Server};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};

/// AccountTable is a credential store that can be updated while the server runs
#[derive(Default)]
struct AccountTable {
    accounts: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl CredentialStore for AccountTable {
    async fn validate(
        &self,
        username: &str,
        password: &str,
        deadline: Instant,
    ) -> anyhow::Result<bool> {
        let accounts = tokio::time::timeout_at(deadline, self.accounts.read()).await?;
        Ok(accounts.get(username).is_some_and(|p| p == password))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let store = Arc::new(AccountTable::default());
    store
        .accounts
        .write()
        .await
        .insert("<user>".to_string(), "<pass>".to_string());

    let opts = Options::default()
        .with_user_pass_auth(true)
        .with_store(store)
        .with_read_timeout(Some(Duration::from_secs(300)))
        .with_dial_timeout(Some(Duration::from_secs(10)));

    let mut server = Socks5Server::new(opts);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
