// src/models/mod.rs

//! Domain models for the headlines pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod outcome;
mod query;

// Re-export all public types
pub use article::{Article, ArticleId, RawArticle, RawPayload, RawSource};
pub use config::{
    API_KEY_ENV, Config, FeedConfig, HttpConfig, MalformedPolicy, NormalizeConfig,
    ScheduleConfig, StorageConfig,
};
pub use outcome::IngestOutcome;
pub use query::{Endpoint, QueryConfiguration, QueryParam};
