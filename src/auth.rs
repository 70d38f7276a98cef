use crate::config::Settings;
use crate::deadline::Deadlines;
use crate::error::{Error, Result};
use crate::protocol::{AuthMethod, AuthStatus, USERPASS_VERSION, Version};
use crate::store::Credentials;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::debug;

/// stand-in for an unbounded store deadline, roughly 30 years out
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// negotiate_auth handles authentication negotiation between the SOCKS server and client
/// and returns the method both sides settled on
pub async fn negotiate_auth<S>(stream: &mut S, settings: &Settings) -> Result<AuthMethod>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let deadlines = &settings.deadlines;

    // ClientHello format
    // +----+----------+----------+
    // |VER | NMETHODS | METHODS  |
    // +----+----------+----------+
    // | 1  |    1     | 1 to 255 |
    // +----+----------+----------+
    let mut buf = [0u8; 2];
    deadlines.read_exact(stream, &mut buf).await?;

    let version = buf[0];
    let n_methods = buf[1];

    if version != Version::SOCKS5 as u8 {
        return Err(Error::UnsupportedVersion(version));
    }

    let mut methods = vec![0u8; n_methods as usize];
    deadlines.read_exact(stream, &mut methods).await?;

    let method = select_auth_method(&methods, &settings.auth_methods);
    debug!("client offered {methods:?}, selected {method:?}");

    // ServerChoice method selection reply format
    // +----+--------+
    // |VER | METHOD |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    deadlines
        .write_all(stream, &[Version::SOCKS5 as u8, method as u8])
        .await?;

    match method {
        AuthMethod::UserPass => authenticate_userpass(stream, settings).await?,
        AuthMethod::NoAuth => (),
        AuthMethod::NoAcceptable => return Err(Error::NoAcceptableAuthMethod),
    }

    Ok(method)
}

/// select_auth_method picks the method to use from those the client offered.
/// Username/password wins over no-auth whenever it is configured, regardless
/// of offer order.
pub fn select_auth_method(client_methods: &[u8], configured: &[AuthMethod]) -> AuthMethod {
    const PREFERRED_METHODS: &[AuthMethod] = &[AuthMethod::UserPass, AuthMethod::NoAuth];

    PREFERRED_METHODS
        .iter()
        .copied()
        .find(|preferred| {
            configured.contains(preferred) && client_methods.contains(&(*preferred as u8))
        })
        .unwrap_or(AuthMethod::NoAcceptable)
}

/// authenticate_userpass runs the RFC 1929 sub-negotiation. A rejected client
/// gets a failure status and no second attempt.
async fn authenticate_userpass<S>(stream: &mut S, settings: &Settings) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let deadlines = &settings.deadlines;
    let creds = read_credentials(stream, deadlines).await?;

    let deadline = store_deadline(settings.store_timeout);
    let verdict = match creds {
        Some(creds) => {
            let lookup = settings
                .store
                .validate(&creds.username, &creds.password, deadline);
            match tokio::time::timeout_at(deadline, lookup).await {
                Ok(res) => res.map_err(Error::Store),
                Err(_) => Err(Error::StoreTimeout(settings.store_timeout)),
            }
        }
        // Non UTF-8 credentials can never match
        None => Ok(false),
    };

    let status = match verdict {
        Ok(true) => AuthStatus::Success,
        _ => AuthStatus::Failure,
    };

    // Username/Password Server response
    // +----+--------+
    // |VER | STATUS |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    deadlines
        .write_all(stream, &[USERPASS_VERSION, status as u8])
        .await?;

    match verdict? {
        true => Ok(()),
        false => Err(Error::AuthenticationFailed),
    }
}

/// store_deadline is the instant a credential lookup must finish by. Timeouts
/// too large to represent saturate to a far-future instant.
fn store_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// read_credentials parses the client's username/password request.
/// Returns None when either field is not valid UTF-8.
async fn read_credentials<R>(stream: &mut R, deadlines: &Deadlines) -> Result<Option<Credentials>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    // Client Username/Password Request
    // +----+------+----------+------+----------+
    // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    // +----+------+----------+------+----------+
    // | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    // +----+------+----------+------+----------+
    let version = deadlines.read_u8(stream).await?;
    if version != USERPASS_VERSION {
        return Err(Error::Protocol(format!(
            "invalid username/password sub-negotiation version: {version:#04x}"
        )));
    }

    let username_len = deadlines.read_u8(stream).await? as usize;
    let mut username = vec![0u8; username_len];
    deadlines.read_exact(stream, &mut username).await?;

    let password_len = deadlines.read_u8(stream).await? as usize;
    let mut password = vec![0u8; password_len];
    deadlines.read_exact(stream, &mut password).await?;

    match (String::from_utf8(username), String::from_utf8(password)) {
        (Ok(username), Ok(password)) => Ok(Some(Credentials { username, password })),
        _ => Ok(None),
    }
}
