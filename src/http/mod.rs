//! HTTP API Server Module
//!
//! REST surface over the analyzer: single and batch analysis, stored results
//! and a health check.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::HttpServer;
