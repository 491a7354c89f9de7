//! Sources of neighbor listings.
//!
//! The [`NeighborSource`] trait is the single I/O seam of the crawler. The
//! production implementation speaks HTTP, tests swap in scripted sources.

use crate::error::QueryError;
use crate::record::NeighborsResponse;
use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Path of the neighbor listing on every node.
pub const NEIGHBORS_PATH: &str = "/v2/neighbors";

/// Default time allowed for a single neighbor request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs exactly one neighbor request against one endpoint.
///
/// Implementations must not retry; retry policy belongs to the
/// [`PeerQueryClient`](crate::PeerQueryClient).
pub trait NeighborSource: Clone + Send + Sync + 'static {
    /// Fetch the neighbor listing served at `endpoint` (`host[:port]`).
    fn fetch(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<NeighborsResponse, QueryError>> + Send;
}

/// Neighbor source issuing `GET http://<endpoint>/v2/neighbors`.
#[derive(Debug, Clone)]
pub struct HttpNeighborSource {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpNeighborSource {
    /// Create a source with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Self {
        HttpNeighborSource {
            client: reqwest::Client::new(),
            request_timeout,
        }
    }

    /// Create a source advertising a custom `User-Agent` header.
    ///
    /// # Errors
    ///
    /// Fails if the user agent is not a valid header value.
    pub fn with_user_agent(
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(HttpNeighborSource {
            client,
            request_timeout,
        })
    }

    /// URL of the neighbor listing for an endpoint.
    pub fn url(endpoint: &str) -> String {
        format!("http://{endpoint}{NEIGHBORS_PATH}")
    }

    async fn request(&self, url: &str) -> Result<NeighborsResponse, QueryError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Default for HttpNeighborSource {
    fn default() -> Self {
        HttpNeighborSource::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl NeighborSource for HttpNeighborSource {
    fn fetch(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<NeighborsResponse, QueryError>> + Send {
        let url = Self::url(endpoint);
        async move {
            debug!("Requesting {url}");
            // The timeout covers connect, headers and body.
            match timeout(self.request_timeout, self.request(&url)).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::Timeout),
            }
        }
    }
}
