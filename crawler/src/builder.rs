//! Builder pattern for configuring and creating crawler instances.

use crate::crawler::Crawler;
use peer_census_query::{
    HttpNeighborSource, NeighborSource, PeerQueryClient, QueryError, QueryPolicy,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BUDGET, DEFAULT_RETRY_DELAY, DEFAULT_RPC_PORT,
};
use std::fmt;
use std::time::Duration;

/// Default maximum number of concurrent query tasks.
const DEFAULT_MAX_CONCURRENT_TASKS: usize = 64;

/// Errors that can occur during crawler configuration.
#[derive(Debug)]
pub enum CrawlerBuilderError {
    /// A crawl needs at least one task slot to make progress.
    ZeroConcurrency,
    /// The HTTP client could not be configured.
    HttpClient(QueryError),
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::ZeroConcurrency => {
                write!(f, "Maximum concurrent tasks must be at least 1")
            }
            CrawlerBuilderError::HttpClient(err) => {
                write!(f, "Invalid HTTP client configuration: {err}")
            }
        }
    }
}

impl std::error::Error for CrawlerBuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlerBuilderError::ZeroConcurrency => None,
            CrawlerBuilderError::HttpClient(err) => Some(err),
        }
    }
}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), peer_census_crawler::CrawlerBuilderError> {
/// use peer_census_crawler::CrawlerBuilder;
/// use std::time::Duration;
///
/// // Create a crawler with the default settings.
/// let basic_crawler = CrawlerBuilder::new().build()?;
///
/// // Create a crawler with custom settings.
/// let custom_crawler = CrawlerBuilder::new()
///     .with_user_agent("peer-census/0.1")
///     .with_default_port(9000)
///     .with_max_concurrent_tasks(250)?
///     .with_retry_budget(1)
///     .with_peer_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlerBuilder {
    /// Custom user agent sent with every request.
    user_agent: Option<String>,
    /// Port appended to addresses reported without one.
    default_port: u16,
    /// Maximum number of concurrent query tasks.
    max_concurrent_tasks: usize,
    /// Retries per candidate endpoint of a peer.
    retry_budget: usize,
    /// Pause before retrying an endpoint.
    retry_delay: Duration,
    /// Timeout for a single neighbor request.
    peer_timeout: Duration,
}

impl CrawlerBuilder {
    /// Create a new crawler builder with default settings.
    pub fn new() -> Self {
        CrawlerBuilder {
            user_agent: None,
            default_port: DEFAULT_RPC_PORT,
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_delay: DEFAULT_RETRY_DELAY,
            peer_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set a custom user agent string for the crawler's HTTP requests.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the RPC port tried for addresses that do not carry one.
    ///
    /// # Arguments
    ///
    /// * `port` - The network's default RPC port (defaults to 8080).
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set the maximum number of concurrent query tasks.
    ///
    /// This caps the number of peers being queried at any instant. Peers
    /// discovered beyond the cap wait in the crawler's queue.
    ///
    /// # Recommendations
    ///
    /// * **Conservative (1-16)** - For slow links or when being polite to the network.
    /// * **Default (64)** - Good balance for most use cases.
    /// * **Aggressive (128-250)** - For fast census of large networks.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The builder for method chaining.
    /// * `Err(CrawlerBuilderError)` - If `max_tasks` is zero.
    pub fn with_max_concurrent_tasks(
        mut self,
        max_tasks: usize,
    ) -> Result<Self, CrawlerBuilderError> {
        if max_tasks == 0 {
            return Err(CrawlerBuilderError::ZeroConcurrency);
        }
        self.max_concurrent_tasks = max_tasks;
        Ok(self)
    }

    /// Set how many times a failed endpoint is retried.
    ///
    /// Each candidate endpoint of a peer is tried `retry_budget + 1` times
    /// before it is abandoned (defaults to 2 retries).
    pub fn with_retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Set the pause between two tries of the same endpoint (defaults to 1 second).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the timeout for a single neighbor request.
    ///
    /// The timeout covers connecting, sending the request and reading the
    /// whole response (defaults to 10 seconds).
    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    fn policy(&self) -> QueryPolicy {
        QueryPolicy {
            retry_budget: self.retry_budget,
            retry_delay: self.retry_delay,
            default_port: self.default_port,
        }
    }

    /// Build a crawler querying peers over HTTP.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - A configured crawler.
    /// * `Err(CrawlerBuilderError)` - If the HTTP client could not be set up.
    pub fn build(self) -> Result<Crawler<HttpNeighborSource>, CrawlerBuilderError> {
        let source = match &self.user_agent {
            Some(user_agent) => HttpNeighborSource::with_user_agent(user_agent, self.peer_timeout)
                .map_err(CrawlerBuilderError::HttpClient)?,
            None => HttpNeighborSource::new(self.peer_timeout),
        };
        Ok(self.build_with_source(source))
    }

    /// Build a crawler on top of any [`NeighborSource`].
    ///
    /// The source is responsible for its own request timeout, so the peer
    /// timeout and user agent settings do not apply.
    pub fn build_with_source<S: NeighborSource>(self, source: S) -> Crawler<S> {
        let policy = self.policy();
        Crawler::new(
            PeerQueryClient::new(source, policy),
            self.max_concurrent_tasks,
        )
    }
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = CrawlerBuilder::new().with_max_concurrent_tasks(0);
        assert!(matches!(result, Err(CrawlerBuilderError::ZeroConcurrency)));
    }

    #[test]
    fn test_settings_reach_crawler() {
        let crawler = CrawlerBuilder::new()
            .with_default_port(9000)
            .with_retry_budget(5)
            .with_retry_delay(Duration::from_millis(10))
            .with_max_concurrent_tasks(3)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(crawler.max_concurrent_tasks(), 3);
        assert_eq!(
            *crawler.policy(),
            QueryPolicy {
                retry_budget: 5,
                retry_delay: Duration::from_millis(10),
                default_port: 9000,
            }
        );
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let result = CrawlerBuilder::new().with_user_agent("bad\nagent").build();
        assert!(matches!(result, Err(CrawlerBuilderError::HttpClient(_))));
    }
}
