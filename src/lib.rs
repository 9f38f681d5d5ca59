//! Flattening of quality-assessed SWOB-ML station observation documents.
//!
//! Each XML document becomes one flat key/value record holding its
//! identification metadata, derived values and, per observation, the value,
//! overall QA summary, per-category QA results and native provider codes.
//! Records are grouped into chunks (fixed size or per station) and each
//! chunk is persisted as one JSON batch keyed by a unique file identifier.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
