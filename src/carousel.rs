use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::utils::manifest::{FileStamp, file_stamp, read_manifest};

/// Schema-free carousel entry (image path, caption, ...).
pub type CarouselItem = BTreeMap<String, String>;

pub type CarouselItems = Arc<Vec<CarouselItem>>;

struct CarouselEntry {
    items: CarouselItems,
    stamp: FileStamp,
    // false while the manifest was modified too recently for its stamp to be trusted
    settled: bool,
    at: Instant,
}

/// Carousel manifest behind a bounded-lifetime cache.
///
/// A loaded result is served as-is for `ttl`. After that the manifest's
/// stamp is checked and the file re-parsed only when it changed, so edits
/// show up within one TTL without re-reading an unchanged file. A zero TTL
/// checks the stamp on every call. A manifest modified within a couple of
/// seconds of being parsed is re-read regardless of its stamp.
pub struct CarouselProvider {
    manifest: PathBuf,
    ttl: Duration,
    cached: RwLock<Option<CarouselEntry>>,
}

impl CarouselProvider {
    pub fn new(manifest: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            manifest: manifest.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn load(&self) -> CarouselItems {
        {
            let cache = self.cached.read().await;
            if let Some(entry) = cache.as_ref() {
                if entry.at.elapsed() < self.ttl {
                    return entry.items.clone();
                }
            }
        }

        let read_at = SystemTime::now();
        let stamp = file_stamp(&self.manifest).await;
        let mut cache = self.cached.write().await;
        if let Some(entry) = cache.as_mut() {
            if entry.settled && entry.stamp == stamp {
                entry.at = Instant::now();
                return entry.items.clone();
            }
        }

        let items: CarouselItems = match read_manifest::<Vec<CarouselItem>>(&self.manifest).await {
            Ok(items) => {
                debug!(target: "photo_site", "loaded {} carousel items", items.len());
                Arc::new(items)
            }
            Err(e) => {
                warn!(target: "photo_site", "carousel error: {e}");
                Arc::new(Vec::new())
            }
        };
        *cache = Some(CarouselEntry {
            items: items.clone(),
            settled: stamp.settled_before(read_at),
            stamp,
            at: Instant::now(),
        });
        items
    }
}
