//! Retried neighbor queries against a single peer.

use crate::address::candidate_endpoints;
use crate::record::{IdentityKey, NeighborRecord};
use crate::source::NeighborSource;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::sleep;

/// Default RPC port appended to bare peer addresses.
pub const DEFAULT_RPC_PORT: u16 = 8080;
/// Default number of retries per candidate endpoint.
pub const DEFAULT_RETRY_BUDGET: usize = 2;
/// Default pause between two tries of the same endpoint.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry policy applied to every peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Retries per candidate endpoint, on top of the first try.
    pub retry_budget: usize,
    /// Pause before retrying the same endpoint.
    pub retry_delay: Duration,
    /// Port appended to addresses without one.
    pub default_port: u16,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        QueryPolicy {
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_delay: DEFAULT_RETRY_DELAY,
            default_port: DEFAULT_RPC_PORT,
        }
    }
}

/// Outcome of querying one peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Whether at least one endpoint answered.
    pub responsive: bool,
    /// Addresses of every reported neighbor.
    pub neighbor_addresses: HashSet<String>,
    /// Identities of every reported neighbor, first seen wins.
    pub neighbor_identities: HashMap<IdentityKey, NeighborRecord>,
}

impl QueryResult {
    fn absorb<'a>(&mut self, records: impl Iterator<Item = &'a NeighborRecord>) {
        for record in records {
            if !record.ip.is_empty() {
                self.neighbor_addresses.insert(record.ip.clone());
            }
            self.neighbor_identities
                .entry(record.identity_key())
                .or_insert_with(|| record.clone());
        }
    }
}

/// Queries a peer's neighbor listing across all of its candidate endpoints.
#[derive(Debug, Clone)]
pub struct PeerQueryClient<S> {
    source: S,
    policy: QueryPolicy,
}

impl<S: NeighborSource> PeerQueryClient<S> {
    pub fn new(source: S, policy: QueryPolicy) -> Self {
        PeerQueryClient { source, policy }
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    /// Query a peer for its neighbors.
    ///
    /// Every candidate endpoint of the address is tried up to
    /// `retry_budget + 1` times. An endpoint that answers is not retried, but
    /// the remaining endpoints are still queried and their neighbors merged,
    /// so a responsive peer may be asked more than once.
    ///
    /// # Arguments
    ///
    /// * `address` - The peer address, as discovered.
    ///
    /// # Returns
    ///
    /// The merged [`QueryResult`]. A peer that never answered yields an
    /// unresponsive, empty result. This never fails.
    pub async fn query(&self, address: &str) -> QueryResult {
        let mut result = QueryResult::default();
        let tries = self.policy.retry_budget + 1;

        for endpoint in candidate_endpoints(address, self.policy.default_port) {
            for attempt in 1..=tries {
                match self.source.fetch(&endpoint).await {
                    Ok(response) => {
                        debug!(
                            "{endpoint} reported {} neighbors",
                            response.records().count()
                        );
                        result.responsive = true;
                        result.absorb(response.records());
                        break;
                    }
                    Err(e) => {
                        debug!("Attempt {attempt}/{tries} against {endpoint} failed: {e}");
                        if attempt < tries {
                            sleep(self.policy.retry_delay).await;
                        }
                    }
                }
            }
        }

        if !result.responsive {
            info!("Peer {address} did not respond");
        }
        result
    }
}
