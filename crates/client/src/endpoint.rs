//! Schedule API endpoints and their pagination policies.

use serde::{Deserialize, Serialize};

/// Endpoints of the schedule API.
///
/// The set is closed; requests can only be built for members, so an
/// out-of-set endpoint is unrepresentable in the typed API. String
/// lookups go through [`Endpoint::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Schedule segments between two stations.
    Search,
    /// Departure/arrival schedule for one station.
    Schedule,
    /// Stations near a coordinate.
    NearestStations,
    /// Stops of one route thread.
    Thread,
    /// Settlement nearest to a coordinate.
    NearestSettlement,
    /// Carrier details.
    Carrier,
    /// Full station directory (large response).
    StationsList,
    /// Attribution/copyright block.
    Copyright,
}

/// How an endpoint's responses are paged and where its items live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// Whether aggregated calls walk this endpoint's pages.
    pub paginate: bool,
    /// Key of the per-page item array, when one exists.
    pub result_key: Option<&'static str>,
}

impl Endpoint {
    pub const ALL: [Endpoint; 8] = [
        Endpoint::Search,
        Endpoint::Schedule,
        Endpoint::NearestStations,
        Endpoint::Thread,
        Endpoint::NearestSettlement,
        Endpoint::Carrier,
        Endpoint::StationsList,
        Endpoint::Copyright,
    ];

    /// URL path segment of the endpoint.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Search => "search",
            Endpoint::Schedule => "schedule",
            Endpoint::NearestStations => "nearest_stations",
            Endpoint::Thread => "thread",
            Endpoint::NearestSettlement => "nearest_settlement",
            Endpoint::Carrier => "carrier",
            Endpoint::StationsList => "stations_list",
            Endpoint::Copyright => "copyright",
        }
    }

    /// Static endpoint-to-pagination-policy table.
    pub fn policy(self) -> PaginationPolicy {
        match self {
            Endpoint::Search => PaginationPolicy { paginate: true, result_key: Some("segments") },
            Endpoint::Schedule => PaginationPolicy { paginate: true, result_key: Some("schedule") },
            Endpoint::NearestStations => PaginationPolicy { paginate: true, result_key: Some("stations") },
            _ => PaginationPolicy { paginate: false, result_key: None },
        }
    }

    /// Look an endpoint up by its wire name.
    pub fn from_name(name: &str) -> Option<Endpoint> {
        Endpoint::ALL.iter().copied().find(|endpoint| endpoint.path() == name)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_endpoints_have_result_keys() {
        assert_eq!(Endpoint::Search.policy(), PaginationPolicy { paginate: true, result_key: Some("segments") });
        assert_eq!(Endpoint::Schedule.policy(), PaginationPolicy { paginate: true, result_key: Some("schedule") });
        assert_eq!(
            Endpoint::NearestStations.policy(),
            PaginationPolicy { paginate: true, result_key: Some("stations") }
        );
    }

    #[test]
    fn test_single_page_endpoints() {
        for endpoint in [
            Endpoint::Thread,
            Endpoint::NearestSettlement,
            Endpoint::Carrier,
            Endpoint::StationsList,
            Endpoint::Copyright,
        ] {
            let policy = endpoint.policy();
            assert!(!policy.paginate, "{endpoint} must not paginate");
            assert!(policy.result_key.is_none());
        }
    }

    #[test]
    fn test_from_name_round_trips() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.path()), Some(endpoint));
        }
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        assert_eq!(Endpoint::from_name("bogus"), None);
        assert_eq!(Endpoint::from_name(""), None);
        assert_eq!(Endpoint::from_name("Search"), None);
    }
}
