//! Internal session coordination for crawling operations.
//!
//! This module contains the [`CrawlSession`] which drives the frontier of a
//! crawl: it owns every piece of crawl state, dispatches query tasks within the
//! concurrency bound and folds their results back into the frontier.

use crate::crawler::{CrawlError, CrawlResult, CrawlerMessage};
use crate::dedup;
use log::{debug, info};
use peer_census_query::{
    candidate_endpoints, IdentityKey, NeighborRecord, NeighborSource, PeerQueryClient,
    QueryResult, UNSPECIFIED_ADDRESS,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Interval between two status lines.
const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Crawl state, only ever touched by the coordinator loop.
///
/// Addresses move from `found` to `queried` before their query task exists,
/// so no address can be dispatched twice however many tasks report it.
#[derive(Debug, Default)]
struct CrawlState {
    /// Every address discovered so far, seeds included.
    found: HashSet<String>,
    /// Addresses claimed for a query. Always a subset of `found`.
    queried: HashSet<String>,
    /// Queried addresses that answered at least once.
    responsive: HashSet<String>,
    /// Reported identities, first seen wins.
    identities: HashMap<IdentityKey, NeighborRecord>,
    /// Claimed addresses waiting for a free task slot.
    pending: VecDeque<String>,
}

impl CrawlState {
    fn seeded(seeds: &[String]) -> Self {
        CrawlState {
            found: seeds.iter().cloned().collect(),
            ..Default::default()
        }
    }

    /// Claim every discovered but unqueried address and queue it.
    fn expand_frontier(&mut self) {
        let unclaimed: Vec<String> = self.found.difference(&self.queried).cloned().collect();
        for address in unclaimed {
            self.queried.insert(address.clone());
            self.pending.push_back(address);
        }
    }

    /// Fold one finished query into the state.
    fn complete(&mut self, address: &str, result: QueryResult) {
        if result.responsive {
            self.responsive.insert(address.to_string());
        }
        self.found.extend(result.neighbor_addresses);
        dedup::merge(&mut self.identities, result.neighbor_identities);
    }

    /// Freeze the state into the final result.
    ///
    /// Seeds are entry points rather than discoveries, so they are removed in
    /// every endpoint form, as is the placeholder for unknown addresses.
    fn finish(mut self, seeds: &[String], default_port: u16) -> CrawlResult {
        for seed in seeds {
            let mut forms = candidate_endpoints(seed, default_port);
            forms.push(seed.clone());
            for form in forms {
                self.found.remove(&form);
                self.responsive.remove(&form);
            }
        }
        self.found.remove(UNSPECIFIED_ADDRESS);
        self.responsive.remove(UNSPECIFIED_ADDRESS);
        dedup::reconcile(&mut self.identities);

        CrawlResult {
            found: self.found,
            queried: self.queried,
            responsive: self.responsive,
            identities: self.identities,
        }
    }
}

/// Internal coordinator for a crawling session.
///
/// # Architecture
///
/// * **Coordinator** (`coordinate()`) - Owns the crawl state, expands the frontier and spawns tasks.
/// * **Tasks** - Query one peer each and hand their result back by value.
pub struct CrawlSession<S> {
    /// Client shared by every query task.
    client: Arc<PeerQueryClient<S>>,
    /// Upper bound on in-flight query tasks.
    max_concurrent_tasks: usize,
    /// Channel for sending progress back to the caller.
    crawl_tx: mpsc::Sender<CrawlerMessage>,
}

impl<S: NeighborSource> CrawlSession<S> {
    pub fn new(
        client: Arc<PeerQueryClient<S>>,
        max_concurrent_tasks: usize,
        crawl_tx: mpsc::Sender<CrawlerMessage>,
    ) -> Self {
        Self {
            client,
            max_concurrent_tasks: max_concurrent_tasks.max(1),
            crawl_tx,
        }
    }

    /// Runs the crawl until the frontier is exhausted.
    ///
    /// # Termination
    ///
    /// The frontier is expanded right after every merge, before the next
    /// completion is awaited. Once no task is in flight and nothing is
    /// pending, every found address has therefore been queried.
    ///
    /// # Errors
    ///
    /// A task that panics aborts the crawl, remaining tasks are cancelled.
    pub async fn coordinate(&self, seeds: Vec<String>) -> Result<CrawlResult, CrawlError> {
        let mut state = CrawlState::seeded(&seeds);
        let mut tasks = JoinSet::new();
        let mut last_log_time = Instant::now();

        state.expand_frontier();

        loop {
            // Fill free slots; anything beyond the bound waits in `pending`.
            while tasks.len() < self.max_concurrent_tasks {
                let Some(address) = state.pending.pop_front() else {
                    break;
                };
                debug!("Dispatching query for {address}");
                let client = self.client.clone();
                tasks.spawn(async move {
                    let result = client.query(&address).await;
                    (address, result)
                });
            }

            // Slots are free whenever the set is empty, so pending is empty too.
            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let (address, result) = joined.map_err(|e| CrawlError::TaskFailed(e.to_string()))?;

            let message = if result.responsive {
                CrawlerMessage::Responsive(address.clone())
            } else {
                CrawlerMessage::Unresponsive(address.clone())
            };
            state.complete(&address, result);
            state.expand_frontier();

            if self.crawl_tx.send(message).await.is_err() {
                debug!("Receiver dropped, crawl continues");
            }

            if last_log_time.elapsed() >= LOG_INTERVAL {
                info!(
                    "{} active tasks (max: {}), {} pending, {} of {} found peers queried",
                    tasks.len(),
                    self.max_concurrent_tasks,
                    state.pending.len(),
                    state.queried.len(),
                    state.found.len()
                );
                last_log_time = Instant::now();
            }
        }

        info!(
            "Crawler exhausted - {} addresses queried, {} responsive",
            state.queried.len(),
            state.responsive.len()
        );
        Ok(state.finish(&seeds, self.client.policy().default_port))
    }
}
