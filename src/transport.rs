//! Retrieving remote resources.

use std::path::Path;

use reqwest::{blocking::Client, StatusCode};
use tracing::debug;

use crate::errors::FogToolsErr;

/// Something that can retrieve the content behind a URL.
pub trait Fetch {
    /// Retrieve the resource. Returns `Ok(None)` if the server says it does not exist.
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FogToolsErr>;
}

/// Fetch resources over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with its own connection pool.
    pub fn new() -> Result<Self, FogToolsErr> {
        let client = Client::builder()
            .user_agent(concat!("fogtools/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FogToolsErr> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes()?.to_vec())),
            // Public S3 buckets answer 403 for missing keys when listing is not allowed.
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            status => Err(FogToolsErr::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Download `url` to `dest`, creating parent directories as needed.
///
/// Returns `false` if the remote resource does not exist, in which case nothing is written.
pub fn download_to<F: Fetch + ?Sized>(
    fetch: &F,
    url: &str,
    dest: &Path,
) -> Result<bool, FogToolsErr> {
    match fetch.fetch(url)? {
        Some(bytes) => {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, bytes)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    use std::{cell::RefCell, collections::HashMap};

    /// In-memory fetcher for tests. Unknown URLs are reported as missing.
    #[derive(Default)]
    pub(crate) struct MockFetcher {
        responses: HashMap<String, Vec<u8>>,
        fallback: Option<Vec<u8>>,
        calls: RefCell<Vec<String>>,
    }

    impl MockFetcher {
        pub(crate) fn new() -> Self {
            MockFetcher::default()
        }

        /// Answer every URL without an explicit response with `body`.
        pub(crate) fn with_fallback(body: &[u8]) -> Self {
            MockFetcher {
                fallback: Some(body.to_vec()),
                ..MockFetcher::default()
            }
        }

        pub(crate) fn respond(mut self, url: &str, body: &[u8]) -> Self {
            self.responses.insert(url.to_owned(), body.to_vec());
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Fetch for MockFetcher {
        fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FogToolsErr> {
            self.calls.borrow_mut().push(url.to_owned());
            Ok(self
                .responses
                .get(url)
                .cloned()
                .or_else(|| self.fallback.clone()))
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
