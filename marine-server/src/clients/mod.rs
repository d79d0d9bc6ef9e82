//! HTTP clients for external collaborators.

pub mod crawler;
pub mod discovery;
pub mod matching;

pub use crawler::{CrawlerClient, CrawlerError};
pub use discovery::{DiscoveryClient, DiscoveryError};
pub use matching::{MatchError, MatchResponse, MatchingClient, DEFAULT_MATCH_TIMEOUT};
