// src/lib.rs

//! Headline feed ingestion with a durable article store and a lazy thumbnail cache.

pub mod cache;
pub mod error;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
