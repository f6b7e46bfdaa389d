use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Listing;

/// Outcome of one `search` call.
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    pub query: String,
    pub listings: Vec<Listing>,
    pub total_results: usize,
    pub search_time: Duration,
    pub timestamp: DateTime<Utc>,
}

impl AggregatedResult {
    pub fn new(query: impl Into<String>, listings: Vec<Listing>, search_time: Duration) -> Self {
        let total_results = listings.len();
        Self {
            query: query.into(),
            listings,
            total_results,
            search_time,
            timestamp: Utc::now(),
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new(), Duration::ZERO)
    }

    pub fn has_results(&self) -> bool {
        !self.listings.is_empty()
    }

    /// Cheapest listing; ties go to the first one encountered.
    pub fn best_price(&self) -> Option<&Listing> {
        cheapest(&self.listings)
    }

    pub fn listings_by_source(&self, source: &str) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|l| l.source().eq_ignore_ascii_case(source))
            .collect()
    }
}

pub(crate) fn cheapest(listings: &[Listing]) -> Option<&Listing> {
    listings.iter().fold(None, |best: Option<&Listing>, l| match best {
        Some(b) if b.price() <= l.price() => Some(b),
        _ => Some(l),
    })
}

/// Listings judged to describe the same product. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProductGroup {
    listings: Vec<Listing>,
}

impl ProductGroup {
    pub(crate) fn new(anchor: Listing) -> Self {
        Self { listings: vec![anchor] }
    }

    pub(crate) fn push(&mut self, listing: Listing) {
        self.listings.push(listing);
    }

    /// Stable ascending sort on adjusted price.
    pub fn sort_by_price(&mut self) {
        self.listings.sort_by(|a, b| a.price().total_cmp(&b.price()));
    }

    pub fn anchor(&self) -> &Listing {
        &self.listings[0]
    }

    /// Cheapest member.
    pub fn best(&self) -> &Listing {
        cheapest(&self.listings).unwrap_or_else(|| self.anchor())
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn into_listings(self) -> Vec<Listing> {
        self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, price: f64, source: &str) -> Listing {
        Listing::new(id, format!("Produto {}", id), price, source, "https://x").unwrap()
    }

    #[test]
    fn test_best_price_ties_go_to_first() {
        let result = AggregatedResult::new(
            "mouse",
            vec![
                listing("a", 50.0, "Amazon"),
                listing("b", 30.0, "Shopee"),
                listing("c", 30.0, "AliExpress"),
            ],
            Duration::from_millis(5),
        );
        assert_eq!(result.total_results, 3);
        assert!(result.has_results());
        assert_eq!(result.best_price().unwrap().id(), "b");
    }

    #[test]
    fn test_empty_result() {
        let result = AggregatedResult::empty("ab");
        assert!(!result.has_results());
        assert!(result.best_price().is_none());
        assert_eq!(result.search_time, Duration::ZERO);
    }

    #[test]
    fn test_listings_by_source_is_case_insensitive() {
        let result = AggregatedResult::new(
            "mouse",
            vec![listing("a", 50.0, "Amazon"), listing("b", 30.0, "Shopee")],
            Duration::ZERO,
        );
        assert_eq!(result.listings_by_source("amazon").len(), 1);
    }

    #[test]
    fn test_group_sort_is_stable() {
        let mut group = ProductGroup::new(listing("a", 20.0, "Amazon"));
        group.push(listing("b", 10.0, "Shopee"));
        group.push(listing("c", 10.0, "AliExpress"));
        group.sort_by_price();
        let ids: Vec<&str> = group.listings().iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(group.best().id(), "b");
    }
}
