//! Fetch module - proxy-routed retrieval of pages and documents
//!
//! This module contains:
//! - The `Transport` seam and its reqwest implementation
//! - Challenge-page detection
//! - User-agent rotation
//! - The `FetchOrchestrator` retry loop tying them to the proxy pool

mod challenge;
mod orchestrator;
mod transport;
mod user_agent;

pub use challenge::{ChallengeDetector, RegexChallengeDetector};
pub use orchestrator::{FetchOrchestrator, FetchSettings};
pub use transport::{
    build_http_client, ReqwestTransport, Transport, TransportError, TransportRequest,
    TransportResponse,
};
pub use user_agent::UserAgentPool;
