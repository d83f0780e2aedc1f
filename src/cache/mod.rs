//! Persistent, content-addressed artifact and descriptor cache
//!
//! ## Cache structure
//!
//! ```text
//! ~/.cache/jumpstart/
//! └── com/example/widget/1.2.0/
//!     ├── widget-1.2.0.json                  descriptor bytes
//!     ├── widget-1.2.0.json.meta.json        descriptor cache entry
//!     ├── widget-1.2.0.bin                   artifact bytes
//!     └── widget-1.2.0.bin.meta.json         artifact cache entry
//! ```
//!
//! A cache hit is validated by presence and a size check only; the stored
//! checksum is never recomputed on a plain read. Re-hashing happens at write
//! time and on explicit [`CacheStore::verify`]. This trades a small risk of
//! undetected on-disk corruption for startup latency.
//!
//! Writes are serialized per coordinate. Unrelated coordinates never contend
//! on a shared lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::domain::Coordinate;
use crate::error::{JumpstartError, Result};
use crate::hash;

/// Default cache directory name under the user's cache directory
const CACHE_DIR: &str = "jumpstart";

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "JUMPSTART_CACHE_DIR";

/// Get the cache root directory path.
///
/// Returns `~/.cache/jumpstart` on Unix or equivalent on other platforms.
/// Can be overridden with the `JUMPSTART_CACHE_DIR` environment variable.
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::cache_dir().ok_or_else(|| JumpstartError::CacheOperationFailed {
        message: "Could not determine cache directory".to_string(),
    })?;

    Ok(base.join(CACHE_DIR))
}

/// What a cache entry stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Descriptor,
    Artifact,
}

impl EntryKind {
    /// File extension of the payload this kind stores.
    fn extension(self) -> &'static str {
        match self {
            EntryKind::Descriptor => "json",
            EntryKind::Artifact => "bin",
        }
    }
}

/// A materialized cache entry. Owned by the cache store; the resolver and
/// fetch coordinator only ever create or read these.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub coordinate: Coordinate,
    pub kind: EntryKind,
    pub local_path: PathBuf,
    pub checksum: String,
    pub size: u64,
    pub fetched_at: u64,
}

/// On-disk sidecar record for a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    coordinate: String,
    kind: EntryKind,
    checksum: String,
    size: u64,
    fetched_at: u64,
}

/// Aggregate cache statistics for the `cache stats` command.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub descriptors: usize,
    pub artifacts: usize,
    pub total_size: u64,
}

impl CacheStats {
    /// Format total size as human-readable string
    pub fn formatted_size(&self) -> String {
        let size = self.total_size as f64;
        if size < 1024.0 {
            format!("{} B", self.total_size)
        } else if size < 1024.0 * 1024.0 {
            format!("{:.1} KB", size / 1024.0)
        } else if size < 1024.0 * 1024.0 * 1024.0 {
            format!("{:.1} MB", size / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", size / (1024.0 * 1024.0 * 1024.0))
        }
    }
}

/// Persistent local store of descriptors and artifacts, addressed by
/// coordinate.
pub struct CacheStore {
    root: PathBuf,
    /// Per-coordinate write locks. The outer map lock is held only long
    /// enough to clone the inner lock handle.
    write_locks: Mutex<HashMap<Coordinate, Arc<Mutex<()>>>>,
}

impl CacheStore {
    /// Open (and create if needed) a cache store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| JumpstartError::CacheOperationFailed {
            message: format!("Failed to create cache directory {}: {}", root.display(), e),
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, coordinate: &Coordinate, kind: EntryKind) -> PathBuf {
        self.root
            .join(coordinate.relative_dir())
            .join(format!("{}.{}", coordinate.file_stem(), kind.extension()))
    }

    fn meta_path(&self, coordinate: &Coordinate, kind: EntryKind) -> PathBuf {
        let mut path = self.payload_path(coordinate, kind).into_os_string();
        path.push(".meta.json");
        PathBuf::from(path)
    }

    fn lock_for(&self, coordinate: &Coordinate) -> Arc<Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks
            .entry(coordinate.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Look up an entry. A hit requires the sidecar record, a payload file,
    /// and a matching size; anything else is a miss (the caller re-fetches).
    pub fn get(&self, coordinate: &Coordinate, kind: EntryKind) -> Result<Option<CacheEntry>> {
        let meta_path = self.meta_path(coordinate, kind);
        if !meta_path.is_file() {
            return Ok(None);
        }

        let record = match read_record(&meta_path) {
            Ok(record) => record,
            // Unreadable sidecar counts as a miss, not a fatal error
            Err(_) => return Ok(None),
        };

        let payload_path = self.payload_path(coordinate, kind);
        let Ok(metadata) = fs::metadata(&payload_path) else {
            return Ok(None);
        };
        if metadata.len() != record.size {
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            coordinate: coordinate.clone(),
            kind,
            local_path: payload_path,
            checksum: record.checksum,
            size: record.size,
            fetched_at: record.fetched_at,
        }))
    }

    /// Write an entry. The payload lands via a temp file rename so a crashed
    /// write never leaves a sidecar pointing at partial bytes.
    pub fn put(
        &self,
        coordinate: &Coordinate,
        kind: EntryKind,
        bytes: &[u8],
        checksum: &str,
    ) -> Result<CacheEntry> {
        let lock = self.lock_for(coordinate);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let payload_path = self.payload_path(coordinate, kind);
        let dir = payload_path
            .parent()
            .ok_or_else(|| JumpstartError::CacheOperationFailed {
                message: format!("No parent directory for {}", payload_path.display()),
            })?;
        fs::create_dir_all(dir).map_err(|e| JumpstartError::CacheOperationFailed {
            message: format!("Failed to create {}: {}", dir.display(), e),
        })?;

        let mut staged =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| JumpstartError::CacheOperationFailed {
                message: format!("Failed to stage cache write: {e}"),
            })?;
        std::io::Write::write_all(&mut staged, bytes).map_err(|e| {
            JumpstartError::FileWriteFailed {
                path: payload_path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        staged
            .persist(&payload_path)
            .map_err(|e| JumpstartError::FileWriteFailed {
                path: payload_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let fetched_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let record = EntryRecord {
            coordinate: coordinate.to_string(),
            kind,
            checksum: checksum.to_string(),
            size: bytes.len() as u64,
            fetched_at,
        };
        let meta_path = self.meta_path(coordinate, kind);
        let rendered =
            serde_json::to_string_pretty(&record).map_err(|e| JumpstartError::CacheOperationFailed {
                message: format!("Failed to encode cache record: {e}"),
            })?;
        fs::write(&meta_path, rendered).map_err(|e| JumpstartError::FileWriteFailed {
            path: meta_path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(CacheEntry {
            coordinate: coordinate.clone(),
            kind,
            local_path: payload_path,
            checksum: checksum.to_string(),
            size: bytes.len() as u64,
            fetched_at,
        })
    }

    /// Remove both kinds of entry for a coordinate.
    pub fn invalidate(&self, coordinate: &Coordinate) -> Result<()> {
        let lock = self.lock_for(coordinate);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        for kind in [EntryKind::Descriptor, EntryKind::Artifact] {
            for path in [self.payload_path(coordinate, kind), self.meta_path(coordinate, kind)] {
                if path.exists() {
                    fs::remove_file(&path).map_err(|e| JumpstartError::CacheOperationFailed {
                        message: format!("Failed to remove {}: {}", path.display(), e),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Forced re-verification: re-hash the payload and compare against the
    /// checksum recorded at write time. Returns `Ok(false)` on mismatch.
    pub fn verify(&self, coordinate: &Coordinate, kind: EntryKind) -> Result<bool> {
        let Some(entry) = self.get(coordinate, kind)? else {
            return Err(JumpstartError::CacheOperationFailed {
                message: format!("No cache entry to verify for {coordinate}"),
            });
        };
        let actual = hash::hash_file(&entry.local_path)?;
        Ok(hash::verify_hash(&entry.checksum, &actual))
    }

    /// List every entry in the store, sorted by coordinate for determinism.
    pub fn list_entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        collect_entries(&self.root, &mut entries)?;
        entries.sort_by(|a, b| {
            (a.coordinate.clone(), a.kind.extension()).cmp(&(b.coordinate.clone(), b.kind.extension()))
        });
        Ok(entries)
    }

    /// Aggregate statistics over the whole store.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for entry in self.list_entries()? {
            match entry.kind {
                EntryKind::Descriptor => stats.descriptors += 1,
                EntryKind::Artifact => stats.artifacts += 1,
            }
            stats.total_size += entry.size;
        }
        Ok(stats)
    }

    /// Delete the entire store contents.
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| JumpstartError::CacheOperationFailed {
                message: format!("Failed to clear cache: {e}"),
            })?;
        }
        fs::create_dir_all(&self.root).map_err(|e| JumpstartError::CacheOperationFailed {
            message: format!("Failed to recreate cache directory: {e}"),
        })?;
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<EntryRecord> {
    let content = fs::read_to_string(path).map_err(|e| JumpstartError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| JumpstartError::CacheOperationFailed {
        message: format!("Invalid cache record {}: {}", path.display(), e),
    })
}

fn collect_entries(dir: &Path, out: &mut Vec<CacheEntry>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).map_err(|e| JumpstartError::CacheOperationFailed {
        message: format!("Failed to read {}: {}", dir.display(), e),
    })? {
        let entry = entry.map_err(|e| JumpstartError::CacheOperationFailed {
            message: format!("Failed to read directory entry: {e}"),
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_entries(&path, out)?;
        } else if path.to_string_lossy().ends_with(".meta.json") {
            let Ok(record) = read_record(&path) else {
                continue;
            };
            let Ok(coordinate) = Coordinate::parse(&record.coordinate) else {
                continue;
            };
            let payload = PathBuf::from(
                path.to_string_lossy()
                    .trim_end_matches(".meta.json")
                    .to_string(),
            );
            out.push(CacheEntry {
                coordinate,
                kind: record.kind,
                local_path: payload,
                checksum: record.checksum,
                size: record.size,
                fetched_at: record.fetched_at,
            });
        }
    }
    Ok(())
}
