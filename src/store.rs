//! Credential stores for username/password authentication.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::time::Instant;

/// Credentials holds a username/password pair read during sub-negotiation
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Passwords stay out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CredentialStore validates client credentials.
///
/// Shared by all connections; implementations must tolerate concurrent
/// calls. `deadline` is the instant after which the server stops waiting,
/// so remote back-ends should give up by then.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn validate(
        &self,
        username: &str,
        password: &str,
        deadline: Instant,
    ) -> anyhow::Result<bool>;
}

/// StaticStore checks credentials against a fixed in-memory table
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    db: HashMap<String, String>,
}

impl StaticStore {
    pub fn new(db: HashMap<String, String>) -> Self {
        Self { db }
    }
}

impl FromIterator<Credentials> for StaticStore {
    fn from_iter<I: IntoIterator<Item = Credentials>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|c| (c.username, c.password)).collect())
    }
}

#[async_trait]
impl CredentialStore for StaticStore {
    async fn validate(
        &self,
        username: &str,
        password: &str,
        _deadline: Instant,
    ) -> anyhow::Result<bool> {
        Ok(self.db.get(username).is_some_and(|stored| stored == password))
    }
}
