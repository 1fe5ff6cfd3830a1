//! RetroChain block ingestion indexer and read API.
//!
//! Pulls blocks, transactions, and ABCI events from a CometBFT RPC endpoint
//! into a local SQLite database (resumable, reindex-safe) and serves
//! explorer-friendly JSON endpoints over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod indexer;
pub mod normalize;
pub mod rpc;
pub mod store;
pub mod telemetry;

pub use config::{ApiConfig, CorsConfig, IndexerConfig};
pub use error::{Error, Result};
pub use indexer::Indexer;
pub use store::Store;
