//! Local library index with fingerprint-validated cache
//!
//! The library is rebuilt from the contracts found under the work directory.
//! A rebuild walks the whole tree, so the result is persisted together with
//! a fingerprint of the tree's state; while the fingerprint is unchanged the
//! persisted library is served as-is.
//!
//! The default fingerprint is the work directory's mtime plus the calendar
//! day. In-place rewrites below the top level do not change it; the
//! `sidecars` mode hashes every contract's path, size and mtime instead.

use crate::error::SyncResult;
use crate::services::contract::{Contract, CONTRACT_FILE_NAME};
use rtag_common::config::{FingerprintMode, RunConfig, STATE_DIR_NAME};
use rtag_common::events::{EventBus, SyncEvent};
use rtag_common::fsutil::atomic_write;
use rtag_common::time::parse_record_time;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// One playable fragment of a library entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRef {
    /// Absolute path of the sliced file
    pub path: String,
    /// ISO-8601 window start
    pub begin: String,
    /// Window length in seconds
    pub duration: i64,
}

/// One tag directory as seen by the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub tag: String,
    pub time: String,
    pub vehicle: String,
    pub date: String,
    /// Partition → fragments still present on disk, in contract order
    pub partitions: BTreeMap<String, Vec<FragmentRef>>,
    #[serde(default)]
    pub last_update: BTreeMap<String, String>,
    /// Tag directory
    pub dir: String,
}

impl LibraryEntry {
    /// All fragments across partitions, partitions in name order
    pub fn all_fragments(&self) -> Vec<&FragmentRef> {
        self.partitions.values().flatten().collect()
    }
}

/// Persisted cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub fingerprint: String,
    pub library: Vec<LibraryEntry>,
}

/// Fingerprint-cached library index over one work directory
pub struct LibraryCache {
    work_dir: PathBuf,
    mode: FingerprintMode,
    events: Option<EventBus>,
    scans: AtomicUsize,
}

impl LibraryCache {
    pub fn new(work_dir: impl Into<PathBuf>, mode: FingerprintMode) -> Self {
        Self {
            work_dir: work_dir.into(),
            mode,
            events: None,
            scans: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.work_dir(), config.fingerprint)
    }

    /// Report cache hits and rebuilds on `bus`
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn cache_path(&self) -> PathBuf {
        self.work_dir.join(STATE_DIR_NAME).join("local_library.json")
    }

    /// Number of full rescans performed by this instance
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Return the library, from cache when the fingerprint still matches
    pub fn get_library(&self) -> SyncResult<Vec<LibraryEntry>> {
        if !self.work_dir.is_dir() {
            tracing::warn!(work_dir = %self.work_dir.display(), "Work directory missing, library is empty");
            return Ok(Vec::new());
        }

        // The state dir lives inside the work dir; create it before taking
        // the fingerprint so creating it does not invalidate the next call.
        let cache_path = self.cache_path();
        if let Some(state_dir) = cache_path.parent() {
            std::fs::create_dir_all(state_dir)?;
        }

        let fingerprint = self.fingerprint()?;

        if let Some(envelope) = self.load_envelope(&cache_path) {
            if envelope.fingerprint == fingerprint {
                tracing::info!(
                    cache = %cache_path.display(),
                    entries = envelope.library.len(),
                    "Library unchanged, serving cache"
                );
                self.emit(envelope.library.len(), true);
                return Ok(envelope.library);
            }
        }

        tracing::info!(work_dir = %self.work_dir.display(), "Scanning library");
        let library = self.scan();
        self.persist(&cache_path, &fingerprint, &library);
        self.emit(library.len(), false);
        Ok(library)
    }

    /// Compute the current fingerprint of the work directory
    pub fn fingerprint(&self) -> SyncResult<String> {
        let day = chrono::Local::now().format("%Y%m%d").to_string();
        match self.mode {
            FingerprintMode::Mtime => {
                let mtime = mtime_nanos(&std::fs::metadata(&self.work_dir)?);
                Ok(format!("{}_{}", day, mtime))
            }
            FingerprintMode::Sidecars => {
                let mut sidecars: Vec<PathBuf> = self.contract_files().collect();
                sidecars.sort();

                let mut hasher = Sha256::new();
                for path in &sidecars {
                    let meta = std::fs::metadata(path)?;
                    let relative = path.strip_prefix(&self.work_dir).unwrap_or(path);
                    hasher.update(relative.to_string_lossy().as_bytes());
                    hasher.update(meta.len().to_le_bytes());
                    hasher.update(mtime_nanos(&meta).to_le_bytes());
                }
                let digest = format!("{:x}", hasher.finalize());
                Ok(format!("{}_{}", day, &digest[..16]))
            }
        }
    }

    /// Rebuild the library from contracts, ignoring the cache
    pub fn scan(&self) -> Vec<LibraryEntry> {
        self.scans.fetch_add(1, Ordering::Relaxed);

        let mut library: Vec<LibraryEntry> = self
            .contract_files()
            .filter_map(|path| {
                let tag_dir = path.parent()?.to_path_buf();
                match Contract::load(&path) {
                    Ok(contract) => entry_from_contract(&tag_dir, contract),
                    Err(e) => {
                        tracing::warn!(contract = %path.display(), error = %e, "Skipping unreadable contract");
                        None
                    }
                }
            })
            .collect();

        // Dash and space time forms both occur; unparseable times go last
        library.sort_by_cached_key(|e| {
            let parsed = parse_record_time(&e.time).ok();
            (parsed.is_none(), parsed, e.time.clone(), e.dir.clone())
        });
        library
    }

    fn contract_files(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.work_dir)
            .into_iter()
            .filter_entry(|e| e.file_name() != STATE_DIR_NAME)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == CONTRACT_FILE_NAME)
            .map(|e| e.into_path())
    }

    fn load_envelope(&self, cache_path: &Path) -> Option<CacheEnvelope> {
        let text = std::fs::read_to_string(cache_path).ok()?;
        match serde_json::from_str(&text) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!(cache = %cache_path.display(), error = %e, "Library cache unreadable, rescanning");
                None
            }
        }
    }

    fn persist(&self, cache_path: &Path, fingerprint: &str, library: &[LibraryEntry]) {
        let envelope = CacheEnvelope {
            fingerprint: fingerprint.to_string(),
            library: library.to_vec(),
        };
        let result = serde_json::to_string_pretty(&envelope)
            .map_err(rtag_common::Error::from)
            .and_then(|json| atomic_write(cache_path, json.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(cache = %cache_path.display(), error = %e, "Failed to persist library cache");
        }
    }

    fn emit(&self, entries: usize, from_cache: bool) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(SyncEvent::LibraryLoaded {
                entries,
                from_cache,
            });
        }
    }
}

fn mtime_nanos(meta: &std::fs::Metadata) -> u128 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .or_else(|| SystemTime::now().duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn entry_from_contract(tag_dir: &Path, contract: Contract) -> Option<LibraryEntry> {
    let duration = contract.tag_info.window_secs();
    let mut partitions = BTreeMap::new();

    for (partition, names) in &contract.files {
        let partition_dir = tag_dir.join(partition);
        let present: Vec<FragmentRef> = names
            .iter()
            .map(|name| partition_dir.join(name))
            .filter(|path| path.is_file())
            .map(|path| FragmentRef {
                path: absolute(&path).to_string_lossy().into_owned(),
                begin: contract.tag_info.abs_start.clone(),
                duration,
            })
            .collect();
        if !present.is_empty() {
            partitions.insert(partition.clone(), present);
        }
    }

    if partitions.is_empty() {
        tracing::debug!(tag_dir = %tag_dir.display(), "No surviving fragments, omitted from library");
        return None;
    }

    Some(LibraryEntry {
        tag: contract.tag_info.name,
        time: contract.tag_info.time,
        vehicle: contract.vehicle,
        date: contract.date,
        partitions,
        last_update: contract.last_update,
        dir: absolute(tag_dir).to_string_lossy().into_owned(),
    })
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
