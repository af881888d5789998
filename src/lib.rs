//! urlmin: minimal query parameter discovery
//!
//! Given a URL with query parameters, finds the smallest subset of those
//! parameters whose rendered page is equivalent to the original page:
//! - URL decomposition and subset enumeration in indicator order
//! - Concurrency-bounded, per-domain throttled fetching with retries
//! - Text normalization and bigram similarity scoring
//! - A decision engine that always picks the minimal satisfying subset
//! - JSON-lines result storage, an HTTP API and offline URL grouping

pub mod analysis;
pub mod config;
pub mod grouping;
pub mod http;
pub mod store;
pub mod types;
pub mod util;

pub use analysis::Analyzer;
pub use config::Config;
pub use types::*;
