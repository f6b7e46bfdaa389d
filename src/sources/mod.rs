//! Marketplace fetchers

pub mod mock;
pub mod static_source;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::RawListing;

pub use mock::MockSource;
pub use static_source::StaticSource;

/// One marketplace the aggregator can query.
///
/// Implementations must be cheap to share across tasks: the aggregator holds
/// them as `Arc<dyn SourceFetcher>` and calls `search` from a spawned task.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Display name, also used as the `source` of every produced listing.
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<RawListing>, SourceError>;

    /// Public page for a record. Defaults to the record's own URL.
    fn listing_url(&self, raw: &RawListing) -> String {
        raw.url.clone().unwrap_or_default()
    }
}
