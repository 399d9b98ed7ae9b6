//! Proxy module - discovery, health probing, scoring and blacklisting of relays
//!
//! # Components
//!
//! - `ProxyPool`: Bounded active set, per-address counters, durable blacklist
//! - `CandidateProvider`: Sources of raw `host:port` candidates
//! - `Prober`: Liveness check run against every candidate on refresh
//! - `Blacklist`: Time-limited exclusion list persisted as JSON

mod blacklist;
mod pool;
mod probe;
mod provider;
mod record;

pub use blacklist::Blacklist;
pub use pool::{PoolSettings, ProxyPool};
pub use probe::{Prober, TunnelProber};
pub use provider::{
    is_valid_address, parse_candidate_list, CandidateProvider, ChainedProvider, ListUrlProvider,
    StaticCandidates,
};
pub use record::{FailureKind, ProxyBinding, ProxyRecord, ProxyStats, ProxyStatus};
