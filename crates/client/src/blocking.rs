//! Synchronous facade over the async client.
//!
//! Owns a current-thread runtime and blocks on the async implementation,
//! so both calling modes share one code path and cannot drift apart:
//! same provenance classification, same counter behavior, same
//! aggregation results.

use rasplet_core::ClientConfig;

use crate::client::Params;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::response::{Aggregate, Envelope};

/// Blocking schedule-API client.
pub struct Client {
    inner: crate::Client,
    runtime: tokio::runtime::Runtime,
}

impl Client {
    /// Build a blocking client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Storage(rasplet_core::Error::Io(e)))?;
        let inner = runtime.block_on(crate::Client::new(config))?;
        Ok(Self { inner, runtime })
    }

    /// Load configuration from the environment and construct a client.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::load()?)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    /// See [`crate::Client::fetch`].
    pub fn fetch(&self, endpoint: Endpoint, params: &Params) -> Result<Envelope, ClientError> {
        self.runtime.block_on(self.inner.fetch(endpoint, params))
    }

    /// See [`crate::Client::fetch_named`].
    pub fn fetch_named(&self, name: &str, params: &Params) -> Result<Envelope, ClientError> {
        self.runtime.block_on(self.inner.fetch_named(name, params))
    }

    /// See [`crate::Client::fetch_all`].
    pub fn fetch_all(&self, endpoint: Endpoint, params: &Params) -> Result<Aggregate, ClientError> {
        self.runtime.block_on(self.inner.fetch_all(endpoint, params))
    }

    /// See [`crate::Client::fetch_all_with`].
    pub fn fetch_all_with(
        &self, endpoint: Endpoint, params: &Params, result_key: Option<&str>,
    ) -> Result<Aggregate, ClientError> {
        self.runtime.block_on(self.inner.fetch_all_with(endpoint, params, result_key))
    }

    /// See [`crate::Client::is_cached`].
    pub fn is_cached(&self, endpoint: Endpoint, params: &Params) -> Result<bool, ClientError> {
        self.runtime.block_on(self.inner.is_cached(endpoint, params))
    }

    /// See [`crate::Client::invalidate`].
    pub fn invalidate(&self, endpoint: Endpoint, params: &Params) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.invalidate(endpoint, params))
    }

    /// Schedule segments between two stations (paginated).
    pub fn search(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::Search, params)
    }

    /// Station schedule (paginated).
    pub fn schedule(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::Schedule, params)
    }

    /// Stations near a coordinate (paginated).
    pub fn nearest_stations(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::NearestStations, params)
    }

    /// Stops of one route thread.
    pub fn thread(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Thread, params)
    }

    /// Settlement nearest to a coordinate.
    pub fn nearest_settlement(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::NearestSettlement, params)
    }

    /// Carrier details.
    pub fn carrier(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Carrier, params)
    }

    /// Full station directory.
    pub fn stations_list(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::StationsList, params)
    }

    /// Attribution/copyright block.
    pub fn copyright(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Copyright, params)
    }
}
