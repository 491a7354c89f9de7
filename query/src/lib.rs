//! Neighbor-list queries against the nodes of a peer-to-peer network.
//!
//! A node serves the neighbors it knows about at `/v2/neighbors`. This crate
//! turns peer addresses into queryable endpoints, performs retried queries and
//! decodes the reported [`NeighborRecord`]s.

mod address;
mod client;
mod error;
mod record;
mod source;

pub use address::candidate_endpoints;
pub use client::{
    PeerQueryClient, QueryPolicy, QueryResult, DEFAULT_RETRY_BUDGET, DEFAULT_RETRY_DELAY,
    DEFAULT_RPC_PORT,
};
pub use error::QueryError;
pub use record::{IdentityKey, NeighborRecord, NeighborsResponse, UNSPECIFIED_ADDRESS};
pub use source::{HttpNeighborSource, NeighborSource, DEFAULT_REQUEST_TIMEOUT, NEIGHBORS_PATH};
