//! Offline Cache facade
//!
//! The narrow API the rest of the application uses: records by id or type,
//! pending actions, images, and maintenance.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::lifecycle::{sweep_expired, DAY_MS};
use crate::cache::{CacheStats, ImageCache, Outbox};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ActionPayload, DrainReport, OptimizeReport, PendingAction, Product, QaItem, Record,
    RecordPayload, RecordType, StorageSize, UserData, Vlog,
};
use crate::network::{Backend, NetworkError};
use crate::store::{actions, images, records, Store};
use crate::tasks::replay::drain_outbox;

// == Image Source ==
/// Where a caller should load an image from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImageSource {
    /// Served from the cache as a `data:` URL
    Cached { data_url: String },
    /// Not cached; load the original URL
    Remote { url: String },
}

impl ImageSource {
    pub fn url(&self) -> &str {
        match self {
            ImageSource::Cached { data_url } => data_url,
            ImageSource::Remote { url } => url,
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

fn data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

// == Settings ==
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub image_cache_max_bytes: u64,
    pub fetch_timeout: Duration,
    pub pending_max_age_days: i64,
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            image_cache_max_bytes: config.image_cache_max_bytes,
            fetch_timeout: config.fetch_timeout(),
            pending_max_age_days: config.pending_max_age_days,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

// == Offline Cache ==
pub struct OfflineCache {
    store: Store,
    images: ImageCache,
    outbox: Outbox,
    backend: Arc<dyn Backend>,
    settings: CacheSettings,
    drain_lock: Mutex<()>,
}

impl std::fmt::Debug for OfflineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCache")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish()
    }
}

impl OfflineCache {
    /// Must be called inside a Tokio runtime (the image cache spawns its
    /// toucher task).
    pub fn new(store: Store, backend: Arc<dyn Backend>, settings: CacheSettings) -> Self {
        Self {
            images: ImageCache::new(store.clone(), settings.image_cache_max_bytes),
            outbox: Outbox::new(store.clone()),
            store,
            backend,
            settings,
            drain_lock: Mutex::new(()),
        }
    }

    /// File-backed cache on the system clock.
    pub fn from_config(config: &Config, backend: Arc<dyn Backend>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Store::open_path(&config.database_path, clock);
        Self::new(store, backend, CacheSettings::from(config))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    // == Records ==
    pub async fn init(&self) -> Result<()> {
        self.store.init().await
    }

    pub async fn put(&self, records: Vec<Record>) -> Result<()> {
        self.store.put(records).await
    }

    pub async fn put_one(&self, record: Record) -> Result<()> {
        self.store.put_one(record).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        self.store.get(id).await
    }

    pub async fn get_by_type(
        &self,
        record_type: RecordType,
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        self.store.get_by_type(record_type, limit).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await
    }

    /// Writes payloads as one batch, each stamped with its type's TTL.
    pub async fn cache_payloads(
        &self,
        payloads: impl IntoIterator<Item = RecordPayload>,
    ) -> Result<usize> {
        let now = self.store.now_ms();
        let batch: Vec<Record> = payloads
            .into_iter()
            .map(|payload| Record::stamped(payload, now))
            .collect();
        let count = batch.len();
        self.store.put(batch).await?;
        Ok(count)
    }

    pub async fn cache_vlogs(&self, vlogs: Vec<Vlog>) -> Result<usize> {
        self.cache_payloads(vlogs.into_iter().map(RecordPayload::Vlog))
            .await
    }

    pub async fn cache_products(&self, products: Vec<Product>) -> Result<usize> {
        self.cache_payloads(products.into_iter().map(RecordPayload::Product))
            .await
    }

    pub async fn cache_qa(&self, items: Vec<QaItem>) -> Result<usize> {
        self.cache_payloads(items.into_iter().map(RecordPayload::Qa))
            .await
    }

    pub async fn set_user_data(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.cache_payloads([RecordPayload::UserData(UserData {
            key: key.to_string(),
            value,
        })])
        .await
        .map(|_| ())
    }

    pub async fn sweep_expired(&self) -> Result<usize> {
        sweep_expired(&self.store).await
    }

    // == Pending Actions ==
    pub async fn enqueue_action(&self, payload: ActionPayload) -> Result<PendingAction> {
        self.outbox.enqueue(payload).await
    }

    pub async fn list_pending_actions(&self) -> Result<Vec<PendingAction>> {
        self.outbox.list_pending().await
    }

    /// Replays the outbox in order. A drain requested while another one is
    /// running is skipped.
    pub async fn drain_pending_actions(&self) -> Result<DrainReport> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            debug!("Outbox drain already running, skipping");
            return Ok(DrainReport::skipped());
        };
        drain_outbox(&self.outbox, self.backend.as_ref()).await
    }

    // == Images ==
    /// Fetches `url` through the backend and stores it.
    pub async fn cache_image(&self, url: &str) -> Result<usize> {
        let bytes = tokio::time::timeout(self.settings.fetch_timeout, self.backend.fetch_image(url))
            .await
            .map_err(|_| NetworkError::Timeout)??;
        self.images.put(url, bytes).await
    }

    pub async fn cache_image_bytes(&self, url: &str, bytes: Vec<u8>) -> Result<usize> {
        self.images.put(url, bytes).await
    }

    /// A `data:` URL for a cached image, or the original URL on a miss.
    ///
    /// Storage failures degrade to the remote URL.
    pub async fn get_cached_image_url(&self, url: &str) -> ImageSource {
        match self.images.get(url).await {
            Ok(Some(bytes)) => ImageSource::Cached {
                data_url: data_url(&bytes),
            },
            Ok(None) => ImageSource::Remote {
                url: url.to_string(),
            },
            Err(e) => {
                warn!("Image cache lookup for {} failed: {}", url, e);
                ImageSource::Remote {
                    url: url.to_string(),
                }
            }
        }
    }

    pub fn image_stats(&self) -> CacheStats {
        self.images.stats()
    }

    // == Maintenance ==
    pub async fn get_storage_size(&self) -> Result<StorageSize> {
        self.store
            .with_conn(|conn| {
                Ok(StorageSize::new(
                    records::total_bytes(conn)?,
                    actions::total_bytes(conn)?,
                    images::total_bytes(conn)?,
                ))
            })
            .await
    }

    /// Expiry sweep, LRU enforcement and stale-action pruning in one pass.
    pub async fn optimize_cache(&self) -> Result<OptimizeReport> {
        let expired_records = self.sweep_expired().await?;
        let evicted_images = self.images.enforce_budget().await?;
        let max_age_ms = self
            .settings
            .pending_max_age_days
            .checked_mul(DAY_MS)
            .ok_or_else(|| {
                CacheError::InvalidRequest("pending_max_age_days is out of range".to_string())
            })?;
        let cutoff = self.store.now_ms() - max_age_ms;
        let dropped_actions = self.outbox.prune_older_than(cutoff).await?;

        Ok(OptimizeReport {
            expired_records,
            evicted_images,
            dropped_actions,
        })
    }
}
