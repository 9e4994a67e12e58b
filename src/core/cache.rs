//! Fingerprint-keyed store of decoded response bodies.
//!
//! Only decoded JSON is ever stored, so an encrypted or garbled body can never
//! be served from cache. Entries live until [`ResponseCache::clear`] or process end.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::YfError;
use crate::endpoint::Fingerprint;

/// Shared response cache. Implementations must tolerate concurrent `get`/`put`.
pub trait ResponseCache: Send + Sync + std::fmt::Debug {
    fn get(&self, fp: &Fingerprint) -> Option<Arc<Value>>;

    /// Stores a decoded body. Later puts for the same fingerprint win.
    fn put(&self, fp: &Fingerprint, body: Arc<Value>);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    map: RwLock<HashMap<Fingerprint, Arc<Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, fp: &Fingerprint) -> Option<Arc<Value>> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fp)
            .cloned()
    }

    fn put(&self, fp: &Fingerprint, body: Arc<Value>) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fp.clone(), body);
    }

    fn clear(&self) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    fingerprint: Fingerprint,
    body: Value,
}

/// In-memory cache backed by one JSON file per fingerprint.
///
/// Files embed the full fingerprint and are ignored unless it matches the
/// lookup exactly. `len` counts the entries this process has loaded or stored.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    memory: MemoryCache,
}

impl DiskCache {
    /// Opens (and creates if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`YfError::Io`] when the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, YfError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            memory: MemoryCache::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, fp: &Fingerprint) -> PathBuf {
        self.dir
            .join(format!("{}.json", hex::encode(fp.to_string().as_bytes())))
    }

    fn load(&self, fp: &Fingerprint) -> Option<Value> {
        let text = fs::read_to_string(self.path_for(fp)).ok()?;
        let entry: StoredEntry = serde_json::from_str(&text).ok()?;
        if entry.fingerprint != *fp {
            #[cfg(feature = "tracing")]
            tracing::debug!(fingerprint = %fp, "disk cache entry does not match its key; ignoring");
            return None;
        }
        Some(entry.body)
    }

    fn store(&self, fp: &Fingerprint, body: &Value) -> Result<(), YfError> {
        let entry = StoredEntry {
            fingerprint: fp.clone(),
            body: body.clone(),
        };
        let text = serde_json::to_string(&entry)
            .map_err(|e| YfError::Schema(format!("cache entry encode: {e}")))?;
        let path = self.path_for(fp);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, fp: &Fingerprint) -> Option<Arc<Value>> {
        if let Some(v) = self.memory.get(fp) {
            return Some(v);
        }
        let body = Arc::new(self.load(fp)?);
        self.memory.put(fp, Arc::clone(&body));
        Some(body)
    }

    fn put(&self, fp: &Fingerprint, body: Arc<Value>) {
        if let Err(_e) = self.store(fp, &body) {
            #[cfg(feature = "tracing")]
            tracing::warn!(fingerprint = %fp, error = %_e, "failed to persist cache entry");
        }
        self.memory.put(fp, body);
    }

    fn clear(&self) {
        self.memory.clear();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(dir = %self.dir.display(), error = %_e, "failed to list cache directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            if let Err(_e) = fs::remove_file(&path) {
                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path.display(), error = %_e, "failed to remove cache entry");
            }
        }
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}
