//! Manifest parsing and task de-duplication
//!
//! A manifest is produced by an external discovery step, one tag per line:
//!
//! ```text
//! 2025-12-27 16:28:10|Hard Brake|/data/soc1/a.record.00001 /data/soc2/a.record.00001
//! ```
//!
//! Lines are sorted by time, lines sharing a `(time, sanitized name)` key are
//! merged by unioning their paths, and ids `01`, `02`, … are assigned in the
//! final order. Parsing the same file twice yields identical tasks.

use crate::error::{SyncError, SyncResult};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rtag_common::time::{format_record_time, parse_record_time};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Characters replaced by `_` in tag names
const HOSTILE_CHARS: &[char] = &[
    '\\', '/', '*', '?', ':', '"', '<', '>', '|', '！', '？', '@', '#', '$', '%', '^', '&', '~',
    '`', '\'', '￥', '+', '[', ']', '{', '}',
];

static RECORD_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.record\.(\d+)").expect("static regex"));

static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("static regex"));

/// One tagged event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Two-digit sequence id, 1-based in time order
    pub id: String,
    /// Tag time, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// Filesystem-safe display name
    pub name: String,
    /// Candidate source fragments
    pub paths: BTreeSet<String>,
}

impl Task {
    /// Tag time as a timestamp
    pub fn tag_time(&self) -> SyncResult<NaiveDateTime> {
        Ok(parse_record_time(&self.time)?)
    }

    /// Group paths into partitions
    ///
    /// A path belongs to the first partition label that equals one of its
    /// components; paths matching no label go to `default_partition`. Each
    /// partition's paths are ordered by record sequence number, then name.
    pub fn partitions(
        &self,
        labels: &[String],
        default_partition: &str,
    ) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &self.paths {
            let partition = partition_of(path, labels).unwrap_or(default_partition);
            groups
                .entry(partition.to_string())
                .or_default()
                .push(path.clone());
        }
        for paths in groups.values_mut() {
            paths.sort_by_key(|p| record_sort_key(p));
        }
        groups
    }
}

fn partition_of<'a>(path: &str, labels: &'a [String]) -> Option<&'a str> {
    Path::new(path).components().find_map(|component| {
        let part = component.as_os_str().to_str()?;
        labels.iter().find(|l| l.as_str() == part).map(String::as_str)
    })
}

/// Sort key for record fragments: embedded sequence number, then file name
pub fn record_sort_key(path: &str) -> (u64, String) {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let sequence = RECORD_SEQUENCE
        .captures(&name)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    (sequence, name)
}

/// Make a tag name safe for use as a directory component
pub fn sanitize_name(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || HOSTILE_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let collapsed = UNDERSCORE_RUN.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Loads manifests into ordered, de-duplicated tasks
pub struct ManifestStore;

impl ManifestStore {
    /// Parse a manifest file
    pub fn parse(manifest_path: &Path) -> SyncResult<Vec<Task>> {
        let content = std::fs::read_to_string(manifest_path).map_err(|e| {
            SyncError::UserInput(format!(
                "Cannot read manifest {}: {}",
                manifest_path.display(),
                e
            ))
        })?;
        let tasks = Self::parse_str(&content)?;
        tracing::info!(
            manifest = %manifest_path.display(),
            tasks = tasks.len(),
            "Manifest parsed"
        );
        Ok(tasks)
    }

    /// Parse manifest text
    ///
    /// A line with fewer than three `|`-separated fields or an unreadable
    /// time fails the whole parse.
    pub fn parse_str(content: &str) -> SyncResult<Vec<Task>> {
        let mut merged: BTreeMap<(NaiveDateTime, String), BTreeSet<String>> = BTreeMap::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.splitn(3, '|').collect();
            if fields.len() < 3 {
                return Err(SyncError::UserInput(format!(
                    "Manifest line {}: expected 'time|name|paths', got '{}'",
                    index + 1,
                    line
                )));
            }

            let time = parse_record_time(fields[0]).map_err(|e| {
                SyncError::UserInput(format!("Manifest line {}: {}", index + 1, e))
            })?;
            let name = sanitize_name(fields[1]);

            merged
                .entry((time, name))
                .or_default()
                .extend(fields[2].split_whitespace().map(str::to_string));
        }

        Ok(merged
            .into_iter()
            .enumerate()
            .map(|(i, ((time, name), paths))| Task {
                id: format!("{:02}", i + 1),
                time: format_record_time(&time),
                name,
                paths,
            })
            .collect())
    }
}
