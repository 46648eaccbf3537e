use std::time::Duration;

use thiserror::Error;

/// FetchError is a transport-level failure: the remote source could not be reached, timed out,
/// or failed TLS verification.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// The raw outcome of a fetch that reached the remote source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetcher retrieves the flag document from the remote source.
///
/// Implementations are called from the refresh thread and must be safe to share with it.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        verify_tls: bool,
    ) -> Result<FetchResponse, FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(&str, Duration, bool) -> Result<FetchResponse, FetchError> + Send + Sync,
{
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        verify_tls: bool,
    ) -> Result<FetchResponse, FetchError> {
        self(url, timeout, verify_tls)
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use std::sync::OnceLock;
    use std::time::Duration;

    use log::debug;
    use reqwest::blocking::Client;

    use super::{FetchError, FetchResponse, Fetcher};

    const USER_AGENT: &str = concat!("flagsync/", env!("CARGO_PKG_VERSION"));

    /// HttpFetcher performs a plain HTTP GET with a blocking [reqwest] client.
    ///
    /// One client is built lazily per TLS verification setting and reused for every later fetch;
    /// the timeout is applied per request.
    ///
    /// It blocks the calling thread, so it must not be called from inside an async runtime.
    #[derive(Clone, Debug, Default)]
    pub struct HttpFetcher {
        verified: OnceLock<Client>,
        unverified: OnceLock<Client>,
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub(super) fn client(&self, verify_tls: bool) -> Result<Client, FetchError> {
            let cell = if verify_tls {
                &self.verified
            } else {
                &self.unverified
            };
            if let Some(client) = cell.get() {
                return Ok(client.clone());
            }

            let client = Client::builder()
                .user_agent(USER_AGENT)
                .danger_accept_invalid_certs(!verify_tls)
                .build()?;
            // a concurrent caller may have won the race; either client is equivalent
            Ok(cell.get_or_init(|| client).clone())
        }

        #[cfg(test)]
        pub(super) fn has_client(&self, verify_tls: bool) -> bool {
            if verify_tls {
                self.verified.get().is_some()
            } else {
                self.unverified.get().is_some()
            }
        }
    }

    impl Fetcher for HttpFetcher {
        fn fetch(
            &self,
            url: &str,
            timeout: Duration,
            verify_tls: bool,
        ) -> Result<FetchResponse, FetchError> {
            let client = self.client(verify_tls)?;

            debug!("fetching flags from {}", url);
            let response = client.get(url).timeout(timeout).send()?;
            let status = response.status().as_u16();
            let body = response.bytes()?;

            Ok(FetchResponse::new(status, body.to_vec()))
        }
    }
}
