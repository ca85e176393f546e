//! Archive download abstraction.
//!
//! [`Fetcher`] is the seam between the provisioning workflow and the
//! network; [`HttpFetcher`] is the production implementation.

use std::io::{self, Write};
use std::time::Duration;

use url::Url;

use crate::error::ProvisionError;

/// Trait for fetching a remote archive.
pub trait Fetcher: Send + Sync {
    /// Streams the resource at `url` into `dest`, returning the byte count.
    fn fetch(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, ProvisionError>;
}

/// Fetcher backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ProvisionError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| ProvisionError::Download {
                url: String::new(),
                status: format!("failed to build http client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[tracing::instrument(name = "HttpFetcher::fetch", skip(self, dest), fields(url = %url))]
    fn fetch(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, ProvisionError> {
        let download_error = |status: String| ProvisionError::Download {
            url: url.to_string(),
            status,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(response.status().to_string()));
        }

        io::copy(&mut response, dest).map_err(|e| download_error(e.to_string()))
    }
}
