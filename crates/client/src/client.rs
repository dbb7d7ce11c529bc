//! The caching schedule-API client.
//!
//! One client owns the request executor and the pagination aggregator:
//!
//! - `fetch` resolves a single page through the cache-aware path and
//!   classifies its provenance (cache hit, live, unknown).
//! - `fetch_all` walks every page of a paginated endpoint, merging the
//!   per-page item arrays into one sequence.
//! - Live requests carrying a valid credential consume the daily quota;
//!   an aggregated call consumes at most one unit regardless of its page
//!   count.
//! - 2xx/3xx responses are force-cached through the sanitizing store, so
//!   persisted entries never embed the credential.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use url::Url;

use rasplet_core::cache::fingerprint::{CREDENTIAL_PARAM, fingerprint};
use rasplet_core::cache::{CacheStore, CachedResponse, SanitizingStore, is_cacheable_status};
use rasplet_core::usage::{UsageCounter, key_id};
use rasplet_core::{ClientConfig, strip_api_key_param};

use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::response::{Aggregate, Envelope, PageBody, Provenance};

/// Query parameters for one call, name-value pairs in caller order.
pub type Params = Vec<(String, String)>;

/// Build a [`Params`] value from string pairs.
pub fn params(pairs: &[(&str, &str)]) -> Params {
    pairs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
}

/// Caching client for the schedule API.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    api_key: String,
    http: reqwest::Client,
    store: Option<Arc<dyn CacheStore>>,
    counter: Arc<dyn UsageCounter>,
}

impl Client {
    /// Build a client from an explicit configuration.
    ///
    /// Constructs the configured cache and counter backends. A missing or
    /// blank API key is fatal here.
    pub async fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let api_key = config.require_api_key()?.to_string();

        let store: Option<Arc<dyn CacheStore>> = if config.cache_enabled {
            let backend = config.cache_backend.build().await?;
            Some(Arc::new(SanitizingStore::new(backend)))
        } else {
            None
        };

        let counter = config
            .counter_backend_or_inferred()
            .build(&key_id(&api_key))
            .await?;

        Self::assemble(config, api_key, store, counter)
    }

    /// Load configuration from the environment and construct a client.
    pub async fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::load()?).await
    }

    /// Build a client over caller-supplied storage and counter.
    ///
    /// The store is still wrapped in the sanitizing decorator; pass `None`
    /// to run without a cache (provenance becomes `Unknown`).
    pub fn with_backends(
        config: ClientConfig, store: Option<Arc<dyn CacheStore>>, counter: Arc<dyn UsageCounter>,
    ) -> Result<Self, ClientError> {
        let api_key = config.require_api_key()?.to_string();
        let store = store.map(|inner| Arc::new(SanitizingStore::new(inner)) as Arc<dyn CacheStore>);
        Self::assemble(config, api_key, store, counter)
    }

    fn assemble(
        config: ClientConfig, api_key: String, store: Option<Arc<dyn CacheStore>>, counter: Arc<dyn UsageCounter>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { config, api_key, http, store, counter })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch a single page from `endpoint`.
    pub async fn fetch(&self, endpoint: Endpoint, params: &Params) -> Result<Envelope, ClientError> {
        let prepared = self.prepare_params(params);
        self.fetch_page(endpoint, &prepared, false).await
    }

    /// Fetch a single page by wire name; unknown names are a caller
    /// error.
    pub async fn fetch_named(&self, name: &str, params: &Params) -> Result<Envelope, ClientError> {
        let endpoint = Endpoint::from_name(name).ok_or_else(|| ClientError::UnknownEndpoint(name.to_string()))?;
        self.fetch(endpoint, params).await
    }

    /// Aggregate every page of `endpoint` using its policy-table entry.
    pub async fn fetch_all(&self, endpoint: Endpoint, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all_with(endpoint, params, endpoint.policy().result_key).await
    }

    /// Aggregate every page, extracting `result_key`'s array from each
    /// page (`None` collects whole pages instead).
    ///
    /// Pages are fetched strictly sequentially: the server-reported total
    /// is only known after page 0. The whole call consumes at most one
    /// quota unit, no matter how many pages were live.
    pub async fn fetch_all_with(
        &self, endpoint: Endpoint, params: &Params, result_key: Option<&str>,
    ) -> Result<Aggregate, ClientError> {
        let limit = self.config.page_size;
        let base: Params = params
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("limit") && !name.eq_ignore_ascii_case("offset"))
            .cloned()
            .collect();
        let base = self.prepare_params(&base);

        let mut items: Vec<Value> = Vec::new();
        let mut pages: u32 = 1;

        let first = self.fetch_offset_page(endpoint, &base, limit, 0).await?;
        let mut any_live = first.provenance == Provenance::Live;
        let meta = first.pagination().unwrap_or_default();
        extend_from_page(&mut items, first, result_key);

        let total = meta.total;
        let mut offset = meta.offset;
        while offset + limit < total {
            offset += limit;
            let page = self.fetch_offset_page(endpoint, &base, limit, offset).await?;
            any_live |= page.provenance == Provenance::Live;
            extend_from_page(&mut items, page, result_key);
            pages += 1;
        }

        // One quota unit for the whole aggregated call, not one per page.
        if any_live && !self.api_key.trim().is_empty() {
            self.check_daily_limit().await?;
            self.counter.increment(today()).await?;
        }

        let provenance = if any_live { Provenance::Live } else { Provenance::Cache };
        Ok(Aggregate { items, pages, provenance })
    }

    /// True when an entry for this exact request is already cached.
    /// Answered from the store directly; no request is issued.
    pub async fn is_cached(&self, endpoint: Endpoint, params: &Params) -> Result<bool, ClientError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let prepared = self.prepare_params(params);
        let url = self.request_url(endpoint, &prepared)?;
        Ok(store.retrieve(&fingerprint("GET", url.as_str())).await?.is_some())
    }

    /// Drop the cached entry for this exact request, if any.
    pub async fn invalidate(&self, endpoint: Endpoint, params: &Params) -> Result<(), ClientError> {
        if let Some(store) = &self.store {
            let prepared = self.prepare_params(params);
            let url = self.request_url(endpoint, &prepared)?;
            store.delete(&fingerprint("GET", url.as_str())).await?;
        }
        Ok(())
    }

    // Named convenience wrappers over the policy table.

    /// Schedule segments between two stations (paginated).
    pub async fn search(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::Search, params).await
    }

    /// Station schedule (paginated).
    pub async fn schedule(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::Schedule, params).await
    }

    /// Stations near a coordinate (paginated).
    pub async fn nearest_stations(&self, params: &Params) -> Result<Aggregate, ClientError> {
        self.fetch_all(Endpoint::NearestStations, params).await
    }

    /// Stops of one route thread.
    pub async fn thread(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Thread, params).await
    }

    /// Settlement nearest to a coordinate.
    pub async fn nearest_settlement(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::NearestSettlement, params).await
    }

    /// Carrier details.
    pub async fn carrier(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Carrier, params).await
    }

    /// Full station directory. The response is large; expect a slow first
    /// call.
    pub async fn stations_list(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::StationsList, params).await
    }

    /// Attribution/copyright block.
    pub async fn copyright(&self, params: &Params) -> Result<Envelope, ClientError> {
        self.fetch(Endpoint::Copyright, params).await
    }

    async fn fetch_offset_page(
        &self, endpoint: Endpoint, base: &Params, limit: u64, offset: u64,
    ) -> Result<Envelope, ClientError> {
        let mut page_params = base.clone();
        page_params.push(("limit".to_string(), limit.to_string()));
        page_params.push(("offset".to_string(), offset.to_string()));
        self.fetch_page(endpoint, &page_params, true).await
    }

    /// Resolve one page: cache read, then (unless cache-only) a live
    /// round trip with forced caching. `suppress_count` defers quota
    /// accounting to the surrounding aggregated call.
    async fn fetch_page(&self, endpoint: Endpoint, prepared: &Params, suppress_count: bool) -> Result<Envelope, ClientError> {
        let url = self.request_url(endpoint, prepared)?;
        let key = fingerprint("GET", url.as_str());

        if let Some(store) = &self.store
            && !self.config.force_live
            && let Some(entry) = store.retrieve(&key).await?
        {
            tracing::debug!(endpoint = endpoint.path(), "cache hit");
            self.log_request(&url, entry.status, entry.body.len(), Provenance::Cache);
            return Ok(Envelope::parse(&entry.body, Provenance::Cache));
        }

        if self.config.cache_only {
            return Err(ClientError::CacheMiss(cache_miss_guidance(endpoint)));
        }

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let provenance = match &self.store {
            Some(store) => {
                if is_cacheable_status(status) {
                    let entry = CachedResponse::new(url.as_str(), status, body.clone());
                    if let Err(e) = store.store(&key, entry).await {
                        tracing::warn!("failed to cache response: {}", e);
                    }
                }
                Provenance::Live
            }
            // No cache instrumentation on this path, so a hit cannot be
            // told apart from a live response.
            None => Provenance::Unknown,
        };

        self.log_request(&url, status, body.len(), provenance);

        if !suppress_count && provenance == Provenance::Live && has_valid_api_key(&self.api_key, &url) {
            self.check_daily_limit().await?;
            self.counter.increment(today()).await?;
        }

        Ok(Envelope::parse(&body, provenance))
    }

    /// Drop ignored parameters from the caller's pairs and append the
    /// configured credential, preserving relative order.
    fn prepare_params(&self, params: &Params) -> Params {
        let mut prepared: Params = params
            .iter()
            .filter(|(name, _)| !self.config.ignore_params.iter().any(|ignored| ignored.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        prepared.push((CREDENTIAL_PARAM.to_string(), self.api_key.clone()));
        prepared
    }

    fn build_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}/", self.config.base_url.trim_end_matches('/'), endpoint.path().trim_matches('/'))
    }

    fn request_url(&self, endpoint: Endpoint, prepared: &Params) -> Result<Url, ClientError> {
        let base = self.build_url(endpoint);
        Url::parse_with_params(&base, prepared.iter().map(|(name, value)| (name.as_str(), value.as_str())))
            .map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))
    }

    async fn check_daily_limit(&self) -> Result<(), ClientError> {
        let count = self.counter.get_count(today()).await?;
        let limit = u64::from(self.config.daily_limit);
        if self.config.safe_mode && count >= limit {
            tracing::warn!(count, limit, "daily API request limit exceeded");
            return Err(ClientError::QuotaExceeded { count, limit });
        }
        Ok(())
    }

    fn log_request(&self, url: &Url, status: u16, bytes: usize, provenance: Provenance) {
        if !self.config.verbose {
            return;
        }
        let cached = if provenance == Provenance::Cache { " cached" } else { "" };
        tracing::info!(
            "GET {} - Status: {}, Data Length: ~{}{}",
            strip_api_key_param(url.as_str()),
            status,
            format_size(bytes),
            cached
        );
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn extend_from_page(items: &mut Vec<Value>, page: Envelope, result_key: Option<&str>) {
    match result_key {
        Some(key) => {
            if let PageBody::Json(mut data) = page.body
                && let Some(slot) = data.get_mut(key)
                && let Value::Array(chunk) = slot.take()
            {
                items.extend(chunk);
            }
        }
        None => items.push(page.into_value()),
    }
}

fn cache_miss_guidance(endpoint: Endpoint) -> String {
    format!("data not found in cache for endpoint '{endpoint}'; set cache_only to false to allow API requests")
}

/// A request only counts against quota when the configured credential is
/// non-blank and the outbound URL's credential value, if present, is
/// non-empty.
fn has_valid_api_key(api_key: &str, url: &Url) -> bool {
    if api_key.trim().is_empty() {
        return false;
    }
    for (name, value) in url.query_pairs() {
        if name.eq_ignore_ascii_case(CREDENTIAL_PARAM) && value.is_empty() {
            return false;
        }
    }
    true
}

/// Human-readable size for verbose request logs.
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    let mut size = bytes as f64;
    let mut index = 0;
    while size >= 1024.0 && index < UNITS.len() - 1 {
        size /= 1024.0;
        index += 1;
    }
    if index == 2 && size > 300.0 {
        tracing::warn!("response is suspiciously large; check that this call is intended");
    }
    format!("{}{}", size.round(), UNITS[index])
}
