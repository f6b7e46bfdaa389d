use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use super::SourceFetcher;
use crate::error::SourceError;
use crate::models::RawListing;

/// Answers every query with the same records. Handy for fixtures and for
/// wiring a marketplace whose catalog is known ahead of time.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    listings: Vec<RawListing>,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, listings: Vec<RawListing>) -> Self {
        Self {
            name: name.into(),
            listings,
            delay: None,
            failure: None,
        }
    }

    /// A source that always reports itself unavailable.
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(name, Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SourceFetcher for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<RawListing>, SourceError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        match &self.failure {
            Some(reason) => Err(SourceError::unavailable(&self.name, reason)),
            None => Ok(self.listings.clone()),
        }
    }
}
