//! Topology crawler for peer-to-peer networks.
//!
//! Starting from seed addresses, every discovered peer is asked for its
//! neighbors until no unqueried address remains. See [`CrawlerBuilder`].

mod builder;
mod crawler;
mod dedup;
mod report;
mod session;

pub use builder::{CrawlerBuilder, CrawlerBuilderError};
pub use crawler::{CrawlError, CrawlResult, Crawler, CrawlerMessage};
pub use report::{
    AddressScope, CountryLookup, NoCountryLookup, Report, StaticCountryLookup, PRIVATE_COUNTRY,
    UNKNOWN_COUNTRY,
};

// Re-exports.
pub use peer_census_query::{
    candidate_endpoints, HttpNeighborSource, IdentityKey, NeighborRecord, NeighborSource,
    NeighborsResponse, QueryError, QueryPolicy,
};
