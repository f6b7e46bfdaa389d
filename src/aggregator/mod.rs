//! Fan-out search across marketplaces, coupon pricing and grouping

pub mod query;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::coupon_engine::{CouponEngine, CouponSnapshot};
use crate::error::SourceError;
use crate::matching::{self, similarity};
use crate::models::{AggregatedResult, Listing, ProductGroup};
use crate::sources::SourceFetcher;

pub use query::validate_query;

const GROUP_KEY_PREFIX_CHARS: usize = 30;

/// Side-by-side pricing of two listings.
#[derive(Debug, Clone, Serialize)]
pub struct ListingComparison {
    pub first: Listing,
    pub second: Listing,
    pub similarity: f64,
    pub are_similar: bool,
    pub cheaper: Listing,
    pub more_expensive: Listing,
    pub price_difference: f64,
    pub price_difference_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Savings {
    pub original_price: f64,
    pub final_price: f64,
    pub savings_amount: f64,
    pub savings_percentage: f64,
}

pub fn calculate_savings(original_price: f64, final_price: f64) -> Savings {
    let savings_amount = original_price - final_price;
    let savings_percentage = if original_price > 0.0 {
        savings_amount / original_price * 100.0
    } else {
        0.0
    };

    Savings {
        original_price,
        final_price,
        savings_amount,
        savings_percentage,
    }
}

pub struct DealAggregator {
    sources: Vec<Arc<dyn SourceFetcher>>,
    coupons: Arc<CouponEngine>,
    config: SearchConfig,
}

impl DealAggregator {
    pub fn new(
        sources: Vec<Arc<dyn SourceFetcher>>,
        coupons: Arc<CouponEngine>,
        config: SearchConfig,
    ) -> Self {
        info!(
            "Deal aggregator initialized with {} sources",
            sources.len()
        );
        Self {
            sources,
            coupons,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn coupons(&self) -> &Arc<CouponEngine> {
        &self.coupons
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query every source concurrently and price the combined listings.
    ///
    /// Never fails: a rejected query, unavailable sources and an elapsed
    /// deadline all degrade to fewer (or zero) listings.
    pub async fn search(&self, query: &str) -> AggregatedResult {
        self.run(query, &self.sources).await
    }

    /// Same pipeline against a single source, matched case-insensitively.
    pub async fn search_source(&self, query: &str, source_name: &str) -> Option<AggregatedResult> {
        let source = self
            .sources
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(source_name))?;

        Some(self.run(query, std::slice::from_ref(source)).await)
    }

    async fn run(&self, query: &str, sources: &[Arc<dyn SourceFetcher>]) -> AggregatedResult {
        let started = Instant::now();

        let collapsed = match validate_query(query) {
            Ok(collapsed) => collapsed,
            Err(e) => {
                warn!("Rejected search query: {}", e);
                return AggregatedResult::empty(query);
            }
        };

        info!("Searching {} sources for '{}'", sources.len(), collapsed);

        let listings = self.fetch_all(&collapsed, sources).await;
        let snapshot = self.coupons.snapshot().await;
        let listings = price_with(&snapshot, listings);

        // The result echoes the query as the caller sent it.
        let result = AggregatedResult::new(query, listings, started.elapsed());
        info!(
            "Search '{}' finished: {} listings in {:?}",
            result.query, result.total_results, result.search_time
        );
        result
    }

    async fn fetch_all(&self, query: &str, sources: &[Arc<dyn SourceFetcher>]) -> Vec<Listing> {
        let per_source = self.config.source_timeout();
        let deadline = self.config.search_deadline();

        let mut tasks = JoinSet::new();
        for source in sources {
            tasks.spawn(fetch_source(Arc::clone(source), query.to_string(), per_source));
        }

        let mut listings = Vec::new();
        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(batch) => listings.extend(batch),
                    Err(e) if e.is_panic() => error!("Source task panicked: {}", e),
                    Err(e) => warn!("Source task cancelled: {}", e),
                }
            }
        };

        let outcome = timeout(deadline, collect).await;
        if outcome.is_err() {
            warn!(
                "Search deadline of {:?} elapsed, abandoning {} sources",
                deadline,
                tasks.len()
            );
            tasks.abort_all();
        }

        listings
    }

    /// Coupon-adjusted copies of `listings`, all priced against one catalog
    /// snapshot.
    pub async fn apply_coupons(&self, listings: Vec<Listing>) -> Vec<Listing> {
        let snapshot = self.coupons.snapshot().await;
        price_with(&snapshot, listings)
    }

    /// Group the result's listings by title similarity. Keys are
    /// `group_<i>_<first 30 chars of the anchor name>`, in anchor order, and
    /// each group is sorted by adjusted price.
    pub fn group_and_compare(&self, result: &AggregatedResult) -> IndexMap<String, ProductGroup> {
        let mut grouped = IndexMap::new();
        if !result.has_results() {
            return grouped;
        }

        let groups = matching::group(result.listings.clone(), self.config.similarity_threshold);
        for (i, mut group) in groups.into_iter().enumerate() {
            let prefix: String = group.anchor().name().chars().take(GROUP_KEY_PREFIX_CHARS).collect();
            group.sort_by_price();
            grouped.insert(format!("group_{}_{}", i, prefix), group);
        }

        info!("Created {} product groups", grouped.len());
        grouped
    }

    /// Cheapest listing, optionally after coupon adjustment. Listings that
    /// already carry a coupon are not discounted twice.
    pub async fn best_deal(&self, listings: &[Listing], apply_coupons: bool) -> Option<Listing> {
        let candidates = if apply_coupons {
            self.apply_coupons(listings.to_vec()).await
        } else {
            listings.to_vec()
        };

        candidates
            .into_iter()
            .reduce(|best, l| if l.price() < best.price() { l } else { best })
    }

    pub async fn compare_listings(&self, first: &Listing, second: &Listing) -> ListingComparison {
        let snapshot = self.coupons.snapshot().await;
        let first = price_one(&snapshot, first.clone());
        let second = price_one(&snapshot, second.clone());

        let score = similarity(first.name(), second.name());
        let (cheaper, more_expensive) = if first.price() < second.price() {
            (first.clone(), second.clone())
        } else {
            (second.clone(), first.clone())
        };

        let price_difference = more_expensive.price() - cheaper.price();
        let price_difference_percentage = if more_expensive.price() > 0.0 {
            price_difference / more_expensive.price() * 100.0
        } else {
            0.0
        };

        ListingComparison {
            first,
            second,
            similarity: score,
            are_similar: score >= self.config.similarity_threshold,
            cheaper,
            more_expensive,
            price_difference,
            price_difference_percentage,
        }
    }
}

async fn fetch_source(source: Arc<dyn SourceFetcher>, query: String, limit: Duration) -> Vec<Listing> {
    let name = source.name().to_string();
    let started = Instant::now();

    let outcome = match timeout(limit, source.search(&query)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            source_name: name.clone(),
            after: limit,
        }),
    };

    let records = match outcome {
        Ok(records) => records,
        Err(e) => {
            warn!("Error searching {}: {}", name, e);
            return Vec::new();
        }
    };

    let fetched_at = Utc::now();
    let listings: Vec<Listing> = records
        .into_iter()
        .filter_map(|raw| {
            let url = source.listing_url(&raw);
            match Listing::from_raw(&name, url, raw, fetched_at) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    debug!("Skipping record from {}: {}", name, e);
                    None
                }
            }
        })
        .collect();

    info!(
        "{} returned {} listings in {:?}",
        name,
        listings.len(),
        started.elapsed()
    );
    listings
}

fn price_with(snapshot: &CouponSnapshot, listings: Vec<Listing>) -> Vec<Listing> {
    listings.into_iter().map(|l| price_one(snapshot, l)).collect()
}

fn price_one(snapshot: &CouponSnapshot, listing: Listing) -> Listing {
    if listing.coupon_code().is_some() {
        return listing;
    }

    let application = snapshot.apply_best(listing.source(), listing.price(), None);
    if !application.applied {
        return listing;
    }

    debug!(
        "Applied coupon {:?} to {} ({:.2} -> {:.2})",
        application.coupon_code,
        listing.name(),
        application.original_price,
        application.final_price
    );
    listing.with_coupon(&application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon_engine::CouponDraft;
    use crate::models::RawListing;
    use crate::sources::StaticSource;

    fn config() -> SearchConfig {
        SearchConfig {
            source_timeout_secs: 1,
            search_deadline_secs: 2,
            ..SearchConfig::default()
        }
    }

    fn coupons() -> Arc<CouponEngine> {
        let shopee = CouponDraft::new("SHOPEE20", "Shopee", "percentage", 20.0)
            .minimum_purchase(200.0)
            .maximum_discount(50.0)
            .build()
            .unwrap();
        Arc::new(CouponEngine::new(vec![shopee]).unwrap())
    }

    fn aggregator(sources: Vec<Arc<dyn SourceFetcher>>) -> DealAggregator {
        DealAggregator::new(sources, coupons(), config())
    }

    fn create_test_listing(id: &str, name: &str, price: f64, source: &str) -> Listing {
        Listing::new(id, name, price, source, format!("https://test.com/{}", id)).unwrap()
    }

    #[tokio::test]
    async fn test_search_applies_coupons() {
        let shopee = StaticSource::new(
            "Shopee",
            vec![
                RawListing::new("s1", "Fone Bluetooth JBL", 300.0),
                RawListing::new("s2", "Cabo USB", 20.0),
            ],
        );
        let agg = aggregator(vec![Arc::new(shopee)]);

        let result = agg.search("fone").await;
        assert_eq!(result.total_results, 2);

        let fone = &result.listings[0];
        assert_eq!(fone.price(), 250.0);
        assert_eq!(fone.original_price(), Some(300.0));
        assert_eq!(fone.coupon_code(), Some("SHOPEE20"));

        let cabo = &result.listings[1];
        assert_eq!(cabo.price(), 20.0);
        assert_eq!(cabo.coupon_code(), None);
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let source = StaticSource::new(
            "Loja",
            vec![
                RawListing::new("1", "Mouse", 50.0),
                RawListing::new("2", "Mouse quebrado", -1.0),
                RawListing::new("", "Sem id", 10.0),
            ],
        );
        let result = aggregator(vec![Arc::new(source)]).search("mouse").await;
        assert_eq!(result.total_results, 1);
    }

    #[tokio::test]
    async fn test_search_source_by_name() {
        let agg = aggregator(vec![
            Arc::new(StaticSource::new("Amazon", vec![RawListing::new("a", "Mouse", 10.0)])),
            Arc::new(StaticSource::new("Shopee", vec![RawListing::new("s", "Mouse", 12.0)])),
        ]);

        let result = agg.search_source("mouse", "amazon").await.unwrap();
        assert_eq!(result.total_results, 1);
        assert_eq!(result.listings[0].source(), "Amazon");
        assert!(agg.search_source("mouse", "Kabum").await.is_none());
        assert_eq!(agg.source_names(), vec!["Amazon", "Shopee"]);
    }

    #[tokio::test]
    async fn test_source_timeout() {
        let slow = StaticSource::new("Lenta", vec![RawListing::new("1", "Mouse", 10.0)])
            .with_delay(Duration::from_secs(5));
        let fast = StaticSource::new("Rapida", vec![RawListing::new("2", "Mouse", 11.0)]);
        let agg = aggregator(vec![Arc::new(slow), Arc::new(fast)]);

        let started = Instant::now();
        let result = agg.search("mouse").await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(result.total_results, 1);
        assert_eq!(result.listings[0].source(), "Rapida");
    }

    #[tokio::test]
    async fn test_group_and_compare() {
        let listings = vec![
            create_test_listing("1", "Notebook Dell Inspiron 15 i5 8GB", 3199.90, "Mercado Livre"),
            create_test_listing("2", "iPhone 13 128GB", 4999.90, "Shopee"),
            create_test_listing("3", "DELL INSPIRON 15 NOTEBOOK i5 8GB RAM", 2999.90, "Amazon"),
        ];
        let result = AggregatedResult::new("notebook", listings, Duration::ZERO);
        let groups = aggregator(Vec::new()).group_and_compare(&result);

        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, ["group_0_Notebook Dell Inspiron 15 i5 8", "group_1_iPhone 13 128GB"]);

        let (_, dell) = groups.get_index(0).unwrap();
        assert_eq!(dell.len(), 2);
        assert_eq!(dell.listings()[0].id(), "3");
        assert_eq!(dell.best().id(), "3");
    }

    #[tokio::test]
    async fn test_group_and_compare_empty() {
        let groups = aggregator(Vec::new()).group_and_compare(&AggregatedResult::empty("x"));
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_best_deal() {
        let agg = aggregator(Vec::new());
        let listings = vec![
            create_test_listing("1", "Fone", 240.0, "Amazon"),
            create_test_listing("2", "Fone", 260.0, "Shopee"),
        ];

        assert_eq!(agg.best_deal(&listings, false).await.unwrap().id(), "1");
        // 260 - 50 beats 240 once coupons count
        let best = agg.best_deal(&listings, true).await.unwrap();
        assert_eq!(best.id(), "2");
        assert_eq!(best.price(), 210.0);
        assert!(agg.best_deal(&[], true).await.is_none());
    }

    #[tokio::test]
    async fn test_compare_listings() {
        let agg = aggregator(Vec::new());
        let a = create_test_listing("1", "Fone Bluetooth JBL Tune", 240.0, "Amazon");
        let b = create_test_listing("2", "JBL Tune Fone Bluetooth", 260.0, "Shopee");

        let cmp = agg.compare_listings(&a, &b).await;
        assert_eq!(cmp.similarity, 100.0);
        assert!(cmp.are_similar);
        assert_eq!(cmp.cheaper.id(), "2");
        assert_eq!(cmp.more_expensive.id(), "1");
        assert_eq!(cmp.price_difference, 30.0);
        assert_eq!(cmp.price_difference_percentage, 12.5);
    }

    #[test]
    fn test_calculate_savings() {
        let savings = calculate_savings(200.0, 150.0);
        assert_eq!(savings.savings_amount, 50.0);
        assert_eq!(savings.savings_percentage, 25.0);
        assert_eq!(calculate_savings(0.0, 0.0).savings_percentage, 0.0);
    }
}
