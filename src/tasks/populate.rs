//! Bulk populate
//!
//! Pulls vlogs, products and Q&A from the backend concurrently. Each source
//! has its own timeout; a failing source is logged and skipped without
//! affecting the others.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::OfflineCache;
use crate::error::Result;
use crate::network::NetworkError;

/// Records written per source. `None` marks a source that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub vlogs: Option<usize>,
    pub products: Option<usize>,
    pub qa: Option<usize>,
}

impl PopulateReport {
    pub fn failed_sources(&self) -> usize {
        [self.vlogs, self.products, self.qa]
            .iter()
            .filter(|n| n.is_none())
            .count()
    }
}

/// Fetches and caches all three sources, settling every one of them.
pub async fn populate(cache: &OfflineCache, timeout: Duration) -> PopulateReport {
    let backend = cache.backend();

    let (vlogs, products, qa) = tokio::join!(
        populate_source("vlogs", timeout, backend.fetch_vlogs(), |items| {
            cache.cache_vlogs(items)
        }),
        populate_source("products", timeout, backend.fetch_products(), |items| {
            cache.cache_products(items)
        }),
        populate_source("qa", timeout, backend.fetch_qa(), |items| {
            cache.cache_qa(items)
        }),
    );

    let report = PopulateReport { vlogs, products, qa };
    info!(
        "Populate finished: vlogs={:?} products={:?} qa={:?}",
        report.vlogs, report.products, report.qa
    );
    report
}

async fn populate_source<T, F, W, Fut>(
    source: &'static str,
    timeout: Duration,
    fetch: F,
    write: W,
) -> Option<usize>
where
    F: Future<Output = std::result::Result<Vec<T>, NetworkError>>,
    W: FnOnce(Vec<T>) -> Fut,
    Fut: Future<Output = Result<usize>>,
{
    let items = match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            warn!("Populate {}: fetch failed: {}", source, e);
            return None;
        }
        Err(_) => {
            warn!("Populate {}: fetch timed out after {:?}", source, timeout);
            return None;
        }
    };

    match write(items).await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Populate {}: caching failed: {}", source, e);
            None
        }
    }
}
