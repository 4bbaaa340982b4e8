//! Per-tag metadata contract (`meta.json`)
//!
//! The contract records which fragment files belong to a tag, per partition.
//! Runs touch one partition at a time, so a merge replaces only that
//! partition's file list and stamp and carries every other entry forward.
//! A contract that does not parse is replaced by a fresh one.

use crate::error::SyncResult;
use crate::services::manifest::Task;
use crate::services::time_window::tag_window;
use rtag_common::config::RunConfig;
use rtag_common::fsutil::{atomic_write, DirLock};
use rtag_common::time::{format_iso, local_stamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Contract file name inside a tag directory
pub const CONTRACT_FILE_NAME: &str = "meta.json";

/// Tag description embedded in the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub offset_bf: i64,
    pub offset_af: i64,
    /// ISO-8601
    pub abs_start: String,
    /// ISO-8601
    pub abs_end: String,
}

impl TagInfo {
    /// Window length in seconds
    pub fn window_secs(&self) -> i64 {
        self.offset_bf + self.offset_af
    }
}

/// On-disk contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub tag_info: TagInfo,
    pub vehicle: String,
    pub date: String,
    /// Partition → `YYYY-MM-DD HH:MM:SS` of its last merge
    #[serde(default)]
    pub last_update: BTreeMap<String, String>,
    /// Partition → fragment file names
    #[serde(default)]
    pub files: BTreeMap<String, Vec<String>>,
    /// Keys written by other producers, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Contract {
    /// Read and parse a contract file
    pub fn load(path: &Path) -> rtag_common::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Read-modify-write of tag contracts
#[derive(Clone)]
pub struct ContractMerger {
    vehicle: String,
    date: String,
    before: i64,
    after: i64,
    lock_timeout: Duration,
}

impl ContractMerger {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            vehicle: config.vehicle.clone(),
            date: config.target_date.clone(),
            before: config.before,
            after: config.after,
            lock_timeout: config.lock_timeout,
        }
    }

    /// Merge `fragments` as the file list of `partition` into the contract at `contract_path`
    ///
    /// Holds an advisory lock on the tag directory for the whole
    /// read-modify-write and publishes with an atomic rename.
    pub fn merge(
        &self,
        contract_path: &Path,
        task: &Task,
        partition: &str,
        fragments: &[String],
    ) -> SyncResult<Contract> {
        let tag_dir = contract_path.parent().unwrap_or_else(|| Path::new("."));
        let _lock = DirLock::acquire(tag_dir, self.lock_timeout)?;

        let base = if contract_path.exists() {
            match Contract::load(contract_path) {
                Ok(existing) => Some(existing),
                Err(e) => {
                    tracing::warn!(
                        contract = %contract_path.display(),
                        error = %e,
                        "Contract unreadable, rewriting from scratch"
                    );
                    None
                }
            }
        } else {
            None
        };

        let window = tag_window(task.tag_time()?, self.before, self.after);
        let (last_update, files, extra) = match base {
            Some(existing) => (existing.last_update, existing.files, existing.extra),
            None => Default::default(),
        };

        let mut contract = Contract {
            tag_info: TagInfo {
                name: task.name.clone(),
                time: task.time.clone(),
                offset_bf: self.before,
                offset_af: self.after,
                abs_start: format_iso(&window.start),
                abs_end: format_iso(&window.end),
            },
            vehicle: self.vehicle.clone(),
            date: self.date.clone(),
            last_update,
            files,
            extra,
        };
        contract
            .files
            .insert(partition.to_string(), fragments.to_vec());
        contract
            .last_update
            .insert(partition.to_string(), local_stamp());

        let json = serde_json::to_string_pretty(&contract).map_err(rtag_common::Error::from)?;
        atomic_write(contract_path, json.as_bytes())?;

        tracing::debug!(
            contract = %contract_path.display(),
            partition,
            fragments = fragments.len(),
            "Contract merged"
        );
        Ok(contract)
    }
}
