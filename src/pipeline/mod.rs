//! Ingestion pipeline and its stages.
//!
//! - `normalize`: raw feed records into canonical articles
//! - `classify`: fetch failures into consumer outcomes
//! - `ingest`: the orchestrating `Ingestor`

pub mod classify;
pub mod ingest;
pub mod normalize;

pub use classify::classify;
pub use ingest::Ingestor;
pub use normalize::{NormalizedBatch, Normalizer};
