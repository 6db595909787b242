//! In-memory file cache
//!
//! Keeps recently served file content in RAM under a total byte budget
//! (by default one quarter of system RAM). Entries are validated against
//! the file's modification time on every hit, so edited files are picked
//! up on the next request. Eviction is least-recently-used. Files larger
//! than one eighth of the budget bypass the cache entirely.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use hyper::body::Bytes;
use tokio::fs;
use tokio::sync::Mutex;

use crate::hooks::Hooks;
use crate::http::{cache, mime};
use crate::logger;

/// A cached file plus the metadata needed to serve it conditionally
pub struct CachedFile {
    pub data: Bytes,
    pub content_type: &'static str,
    pub etag: String,
    mtime: SystemTime,
}

impl CachedFile {
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct Inner {
    entries: HashMap<PathBuf, Arc<CachedFile>>,
    /// Recency order, least recent at the front
    order: VecDeque<PathBuf>,
    total_bytes: u64,
}

/// Byte-bounded LRU cache of file content
pub struct FileCache {
    inner: Mutex<Inner>,
    max_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl FileCache {
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                total_bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Fetch a file through the cache.
    ///
    /// Returns `Ok(None)` when the path does not exist or is not a regular
    /// file. A fresh read passes through the `read_custom` hook before the
    /// result is cached, so transforms are paid once per file version.
    pub async fn get(
        &self,
        path: &Path,
        hooks: &Arc<dyn Hooks>,
    ) -> io::Result<Option<Arc<CachedFile>>> {
        let meta = match fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !meta.is_file() {
            return Ok(None);
        }
        let mtime = meta.modified()?;

        // Fast path: cached and still current
        {
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(path) {
                if entry.mtime == mtime {
                    let entry = Arc::clone(entry);
                    touch(&mut inner.order, path);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry));
                }
                // Stale: drop before reloading
                remove_entry(&mut inner, path);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        // Read outside the lock; concurrent misses may read twice, the
        // insert below is idempotent
        let raw = fs::read(path).await?;
        let data = hooks.read_custom(path, raw);
        let etag = cache::generate_etag(&data);
        let content_type = mime::content_type_for(path.extension().and_then(|e| e.to_str()));
        let entry = Arc::new(CachedFile {
            data: Bytes::from(data),
            content_type,
            etag,
            mtime,
        });

        let entry_bytes = entry.len() as u64;
        if entry_bytes <= self.max_bytes / 8 {
            let mut inner = self.inner.lock().await;
            if let Some(old) = inner.entries.insert(path.to_path_buf(), Arc::clone(&entry)) {
                inner.total_bytes -= old.len() as u64;
            } else {
                inner.order.push_back(path.to_path_buf());
            }
            inner.total_bytes += entry_bytes;
            touch(&mut inner.order, path);
            self.evict_over_budget(&mut inner);
        }

        Ok(Some(entry))
    }

    /// Evict least-recently-used entries until the budget holds
    fn evict_over_budget(&self, inner: &mut Inner) {
        while inner.total_bytes > self.max_bytes {
            let Some(victim) = inner.order.pop_front() else {
                break;
            };
            if let Some(old) = inner.entries.remove(&victim) {
                inner.total_bytes -= old.len() as u64;
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Current cached byte total (for tests and stats)
    pub async fn total_bytes(&self) -> u64 {
        self.inner.lock().await.total_bytes
    }

    /// Log hit/miss/eviction counters, called during shutdown
    pub fn log_stats(&self) {
        logger::log_cache_stats(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
        );
    }
}

/// Move a key to the most-recent end of the order queue
fn touch(order: &mut VecDeque<PathBuf>, path: &Path) {
    if let Some(pos) = order.iter().position(|p| p == path) {
        if let Some(key) = order.remove(pos) {
            order.push_back(key);
        }
    }
}

fn remove_entry(inner: &mut Inner, path: &Path) {
    if let Some(old) = inner.entries.remove(path) {
        inner.total_bytes -= old.len() as u64;
    }
    if let Some(pos) = inner.order.iter().position(|p| p == path) {
        inner.order.remove(pos);
    }
}
