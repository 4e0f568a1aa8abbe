//! City search and reverse geocoding over OpenWeatherMap's geocoding API.
//!
//! Search never fails: short queries and upstream errors both come back as an
//! empty list, and callers treat them the same.

use futures::future::join_all;
use stillsky_core::SearchConfig;

use crate::client::OpenWeatherClient;
use crate::types::{Coordinates, GeocodedPlace, LocationCandidate};

/// Name used when reverse geocoding finds nothing.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Clone)]
pub struct LocationResolver {
    client: OpenWeatherClient,
    search: SearchConfig,
}

impl LocationResolver {
    pub fn new(client: OpenWeatherClient, search: SearchConfig) -> Self {
        Self { client, search }
    }

    /// Ranked, deduplicated candidates for a free-text query.
    pub async fn search(&self, query: &str) -> Vec<LocationCandidate> {
        if query.trim().chars().count() < self.search.min_query_len {
            return Vec::new();
        }

        let variants = query_variants(query, self.search.min_query_len);
        tracing::debug!("Searching {} variant(s) of {:?}", variants.len(), query);

        let limit = self.search.per_variant_limit;
        let lookups = variants
            .iter()
            .map(|variant| self.client.geocode_direct(variant, limit));
        let results = join_all(lookups).await;

        let mut merged = Vec::new();
        for (variant, result) in variants.iter().zip(results) {
            match result {
                Ok(places) => merged.extend(places),
                Err(e) => tracing::warn!("Geocoding lookup for {:?} failed: {}", variant, e),
            }
        }

        let unique = dedup_nearby(merged, self.search.dedup_epsilon);
        let ranked = rank_by_relevance(unique, query);

        ranked
            .into_iter()
            .take(self.search.max_results)
            .enumerate()
            .map(|(position, place)| LocationCandidate::from_place(place, position))
            .collect()
    }

    /// Human-readable name for coordinates, e.g. "Springfield, Illinois, US".
    /// Falls back to [`UNKNOWN_LOCATION`] on any failure.
    pub async fn describe(&self, coords: Coordinates) -> String {
        match self.client.geocode_reverse(coords, 1).await {
            Ok(places) => match places.into_iter().next() {
                Some(place) => display_name(&place),
                None => UNKNOWN_LOCATION.to_string(),
            },
            Err(e) => {
                tracing::warn!("Reverse geocode for {} failed: {}", coords, e);
                UNKNOWN_LOCATION.to_string()
            }
        }
    }
}

fn display_name(place: &GeocodedPlace) -> String {
    match &place.state {
        Some(state) => format!("{}, {}, {}", place.name, state, place.country),
        None => format!("{}, {}", place.name, place.country),
    }
}

/// The raw query, its whitespace-collapsed form and the part before the first
/// comma; variants shorter than `min_len` or already present are skipped.
fn query_variants(query: &str, min_len: usize) -> Vec<String> {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
    let before_comma = query.split(',').next().unwrap_or_default().trim().to_string();

    let mut variants: Vec<String> = Vec::with_capacity(3);
    for variant in [query.to_string(), normalized, before_comma] {
        if variant.trim().chars().count() >= min_len && !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}

/// Keep the first of any candidates within `epsilon` degrees (inclusive) on both axes.
fn dedup_nearby(places: Vec<GeocodedPlace>, epsilon: f64) -> Vec<GeocodedPlace> {
    let mut kept: Vec<GeocodedPlace> = Vec::with_capacity(places.len());
    for place in places {
        let duplicate = kept.iter().any(|k| {
            (k.latitude - place.latitude).abs() <= epsilon
                && (k.longitude - place.longitude).abs() <= epsilon
        });
        if !duplicate {
            kept.push(place);
        }
    }
    kept
}

fn relevance_tier(name: &str, query: &str) -> u8 {
    if name == query {
        0
    } else if name.starts_with(query) {
        1
    } else if name.contains(query) {
        2
    } else {
        3
    }
}

/// Exact, then prefix, then substring matches, then the rest; shorter names
/// first within a tier. Stable, so ties keep discovery order.
fn rank_by_relevance(mut places: Vec<GeocodedPlace>, query: &str) -> Vec<GeocodedPlace> {
    let query = query.trim().to_lowercase();
    places.sort_by_cached_key(|p| {
        let name = p.name.to_lowercase();
        (relevance_tier(&name, &query), name.chars().count())
    });
    places
}
