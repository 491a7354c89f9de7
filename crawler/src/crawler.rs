use crate::session::CrawlSession;
use log::debug;
use peer_census_query::{
    IdentityKey, NeighborRecord, NeighborSource, PeerQueryClient, QueryPolicy,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver};

/// Capacity of the channel carrying [`CrawlerMessage`]s to the caller.
const MESSAGE_BUFFER: usize = 1000;

/// Errors that abort a crawl.
///
/// Unreachable peers are never errors, these only signal defects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// A query task died instead of reporting its result.
    TaskFailed(String),
    /// The crawl session stopped without a final result.
    SessionClosed,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlError::TaskFailed(reason) => {
                write!(f, "Crawl aborted, query task failed: {reason}")
            }
            CrawlError::SessionClosed => write!(f, "Crawl session ended without a result"),
        }
    }
}

impl std::error::Error for CrawlError {}

/// Final state of a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    /// Addresses discovered through neighbor listings, seeds excluded.
    pub found: HashSet<String>,
    /// Every address a query was dispatched for, seeds included.
    pub queried: HashSet<String>,
    /// Discovered addresses that answered at least once.
    pub responsive: HashSet<String>,
    /// Reported neighbor identities after reconciliation.
    pub identities: HashMap<IdentityKey, NeighborRecord>,
}

impl CrawlResult {
    /// Discovered addresses that never answered.
    pub fn unresponsive(&self) -> HashSet<&String> {
        self.found.difference(&self.responsive).collect()
    }
}

/// Messages sent from the [`Crawler`] to the caller about peer discovery.
#[derive(Debug, Clone)]
pub enum CrawlerMessage {
    /// A peer answered its neighbor query.
    Responsive(String),
    /// A peer did not answer on any endpoint.
    Unresponsive(String),
    /// The frontier is exhausted. Always the last message of a crawl.
    Finished(CrawlResult),
    /// The crawl was aborted by a defect. Always the last message of a crawl.
    Failed(CrawlError),
}

impl fmt::Display for CrawlerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerMessage::Responsive(address) => write!(f, "Responsive peer: {address}"),
            CrawlerMessage::Unresponsive(address) => write!(f, "Unresponsive peer: {address}"),
            CrawlerMessage::Finished(result) => write!(
                f,
                "Crawl finished: {} peers found, {} responsive",
                result.found.len(),
                result.responsive.len()
            ),
            CrawlerMessage::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// A crawler mapping a peer-to-peer network through neighbor listings.
///
/// Built with a [`CrawlerBuilder`](crate::CrawlerBuilder).
#[derive(Debug)]
pub struct Crawler<S> {
    client: Arc<PeerQueryClient<S>>,
    max_concurrent_tasks: usize,
}

impl<S> Clone for Crawler<S> {
    fn clone(&self) -> Self {
        Crawler {
            client: self.client.clone(),
            max_concurrent_tasks: self.max_concurrent_tasks,
        }
    }
}

impl<S: NeighborSource> Crawler<S> {
    pub(crate) fn new(client: PeerQueryClient<S>, max_concurrent_tasks: usize) -> Self {
        Crawler {
            client: Arc::new(client),
            max_concurrent_tasks,
        }
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.max_concurrent_tasks
    }

    pub fn policy(&self) -> &QueryPolicy {
        self.client.policy()
    }

    /// Crawl the network starting from the seed addresses.
    ///
    /// This method returns a channel that receives a message for every peer
    /// as its query completes, followed by exactly one
    /// [`CrawlerMessage::Finished`] or [`CrawlerMessage::Failed`].
    ///
    /// # Termination
    ///
    /// The crawl always runs until every discovered address has been queried.
    /// Dropping the receiver does not stop it.
    ///
    /// # Arguments
    ///
    /// * `seeds` - Entry points of the crawl, excluded from the final result.
    pub fn crawl<I, A>(&self, seeds: I) -> Receiver<CrawlerMessage>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let (crawl_tx, crawl_rx) = mpsc::channel(MESSAGE_BUFFER);
        let seeds: Vec<String> = seeds.into_iter().map(Into::into).collect();
        let session = CrawlSession::new(
            self.client.clone(),
            self.max_concurrent_tasks,
            crawl_tx.clone(),
        );

        tokio::spawn(async move {
            let message = match session.coordinate(seeds).await {
                Ok(result) => CrawlerMessage::Finished(result),
                Err(err) => CrawlerMessage::Failed(err),
            };
            if crawl_tx.send(message).await.is_err() {
                debug!("Receiver dropped before the crawl finished");
            }
        });

        crawl_rx
    }

    /// Crawl the network and wait for the final result.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The frontier was exhausted.
    /// * `Err(CrawlError)` - The crawl was aborted by a defect.
    pub async fn run<I, A>(&self, seeds: I) -> Result<CrawlResult, CrawlError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut crawl_rx = self.crawl(seeds);
        while let Some(message) = crawl_rx.recv().await {
            match message {
                CrawlerMessage::Finished(result) => return Ok(result),
                CrawlerMessage::Failed(err) => return Err(err),
                progress => debug!("{progress}"),
            }
        }
        Err(CrawlError::SessionClosed)
    }
}
