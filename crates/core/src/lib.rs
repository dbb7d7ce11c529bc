//! Core types and shared functionality for rasplet.
//!
//! This crate provides:
//! - Cache storage adapters (SQLite/file/in-memory/Redis) behind one
//!   capability trait, with a credential-scrubbing decorator
//! - Cache key sanitization and fingerprinting
//! - Daily usage counters over the same set of backends
//! - Configuration structures with layered loading
//! - Unified storage error types

pub mod cache;
pub mod config;
pub mod error;
pub mod usage;

pub use cache::fingerprint::{CREDENTIAL_PARAM, fingerprint, strip_api_key_param};
pub use cache::{CacheBackend, CacheStore, CachedResponse, SanitizingStore};
pub use config::{ClientConfig, ConfigError};
pub use error::Error;
pub use usage::{CounterBackend, UsageCounter};
