use crate::deadline::Deadlines;
use crate::driver::{Driver, TcpDriver};
use crate::logger::{Logger, TracingLogger};
use crate::protocol::AuthMethod;
use crate::store::{CredentialStore, Credentials, StaticStore};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:1080";
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PASSWORD: &str = "password";

/// Options configures a Socks5Server.
///
/// Collaborators left unset fall back to the defaults when the server is
/// built: a [`TracingLogger`], a [`StaticStore`] over `static_credentials`
/// and a [`TcpDriver`] bound to `listen_addr`.
#[derive(Clone)]
pub struct Options {
    pub listen_addr: String,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub dial_timeout: Option<Duration>,
    /// how long a credential lookup may take
    pub store_timeout: Duration,
    pub user_pass_auth: bool,
    pub static_credentials: Vec<Credentials>,
    pub logger: Option<Arc<dyn Logger>>,
    pub store: Option<Arc<dyn CredentialStore>>,
    pub driver: Option<Arc<dyn Driver>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            read_timeout: None,
            write_timeout: None,
            dial_timeout: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            user_pass_auth: false,
            static_credentials: vec![Credentials::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)],
            logger: None,
            store: None,
            driver: None,
        }
    }
}

impl Options {
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_user_pass_auth(mut self, enabled: bool) -> Self {
        self.user_pass_auth = enabled;
        self
    }

    /// with_static_credentials replaces the built-in account table
    pub fn with_static_credentials(mut self, creds: impl IntoIterator<Item = Credentials>) -> Self {
        self.static_credentials = creds.into_iter().collect();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// auth_methods is the set of methods the server accepts
    pub fn auth_methods(&self) -> Vec<AuthMethod> {
        if self.user_pass_auth {
            vec![AuthMethod::UserPass]
        } else {
            vec![AuthMethod::NoAuth]
        }
    }

    pub fn deadlines(&self) -> Deadlines {
        Deadlines::new(self.read_timeout, self.write_timeout)
    }
}

/// Settings is the resolved, read-only configuration shared by every
/// connection task
pub struct Settings {
    pub auth_methods: Vec<AuthMethod>,
    pub deadlines: Deadlines,
    pub dial_timeout: Option<Duration>,
    pub store_timeout: Duration,
    pub logger: Arc<dyn Logger>,
    pub store: Arc<dyn CredentialStore>,
    pub driver: Arc<dyn Driver>,
}

impl From<Options> for Settings {
    fn from(opts: Options) -> Self {
        let auth_methods = opts.auth_methods();
        let deadlines = opts.deadlines();

        let logger = opts
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn Logger>);
        let store = match opts.store {
            Some(store) => store,
            None => Arc::new(opts.static_credentials.into_iter().collect::<StaticStore>()),
        };
        let driver = match opts.driver {
            Some(driver) => driver,
            None => Arc::new(TcpDriver::new(opts.listen_addr)),
        };

        Self {
            auth_methods,
            deadlines,
            dial_timeout: opts.dial_timeout,
            store_timeout: opts.store_timeout,
            logger,
            store,
            driver,
        }
    }
}
