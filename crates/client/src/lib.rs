//! Caching client for the Yandex.Rasp transit-schedule API.
//!
//! This crate provides:
//! - Cache-first request execution with forced caching of 2xx/3xx
//!   responses and credential scrubbing of every persisted entry
//! - Automatic pagination, merging per-page item arrays into one
//!   sequence
//! - Daily usage accounting over pluggable counter backends, with a safe
//!   mode that fails calls once the budget is spent
//! - Cache-only operation for offline use
//! - A blocking facade with outcomes identical to the async client

pub mod blocking;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod response;

pub use client::{Client, Params, params};
pub use endpoint::{Endpoint, PaginationPolicy};
pub use error::ClientError;
pub use response::{Aggregate, Envelope, PageBody, PageMeta, Provenance};
