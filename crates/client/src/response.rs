//! Response envelopes, provenance classification, and pagination
//! metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Served from the local cache.
    Cache,
    /// Live network round trip through the instrumented cache path.
    Live,
    /// The request bypassed cache instrumentation (caching disabled, or a
    /// harness transport); neither a verified hit nor quota-countable.
    Unknown,
}

/// Parsed page body.
///
/// Malformed JSON is preserved as data rather than raised, so pagination
/// loops and callers can inspect a bad page without crashing.
#[derive(Debug, Clone, PartialEq)]
pub enum PageBody {
    Json(Value),
    Malformed { raw: String },
}

/// Pagination metadata as reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// One page-level response with its provenance.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub body: PageBody,
    pub provenance: Provenance,
}

impl Envelope {
    /// Parse a raw body leniently; decode failures become
    /// [`PageBody::Malformed`].
    pub(crate) fn parse(raw: &str, provenance: Provenance) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(data) => Self { body: PageBody::Json(data), provenance },
            Err(_) => Self { body: PageBody::Malformed { raw: raw.to_string() }, provenance },
        }
    }

    /// Parsed JSON payload, if the body decoded.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            PageBody::Json(data) => Some(data),
            PageBody::Malformed { .. } => None,
        }
    }

    /// Pagination block, when the payload carries one.
    pub fn pagination(&self) -> Option<PageMeta> {
        let block = self.json()?.get("pagination")?;
        serde_json::from_value(block.clone()).ok()
    }

    /// True only for a verified cache hit.
    pub fn is_from_cache(&self) -> bool {
        self.provenance == Provenance::Cache
    }

    /// Page content for whole-page aggregation. A malformed body becomes
    /// an error-flagged object carrying the raw text.
    pub(crate) fn into_value(self) -> Value {
        match self.body {
            PageBody::Json(data) => data,
            PageBody::Malformed { raw } => serde_json::json!({
                "error": "failed to decode JSON",
                "raw": raw,
            }),
        }
    }
}

/// Result of one aggregated (auto-paginated) call.
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// Concatenated items (or whole pages when no result key applies).
    pub items: Vec<Value>,
    /// Number of page fetches the call performed.
    pub pages: u32,
    /// `Cache` only when no page was a live fetch.
    pub provenance: Provenance,
}

impl Aggregate {
    /// True only when every page was a verified cache hit.
    pub fn is_from_cache(&self) -> bool {
        self.provenance == Provenance::Cache
    }
}
