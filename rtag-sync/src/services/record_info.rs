//! Record inspection through the record tool's `info` command
//!
//! Only the summary lines are read: `begin_time:`, `end_time:`, `duration:`
//! and one `<channel> <count> messages` line per channel.

use crate::backend::{quote_arg, ExecutionBackend};
use crate::error::SyncResult;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rtag_common::time::parse_record_time;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(begin|end)_time:\s+(\d{4}[-\s]\d{2}[-\s]\d{2}[-\s]\d{2}:\d{2}:\d{2})")
        .expect("static regex")
});

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"duration:\s+(\d+\.?\d*)").expect("static regex"));

static CHANNEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(/[/\w.\-]+)\s+(\d+)\s+messages").expect("static regex"));

/// Info output parse errors
#[derive(Debug, Error)]
pub enum RecordInfoError {
    /// A required summary line is absent
    #[error("Record info output has no {0} line")]
    MissingField(&'static str),

    /// A timestamp or number did not parse
    #[error("Record info output has an invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Message count of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStat {
    pub name: String,
    pub messages: u64,
}

/// Parsed `info` summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInfo {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Whole seconds, rounded down
    pub duration: i64,
    /// Sorted by name
    pub channels: Vec<ChannelStat>,
}

/// Parse the stdout of `<tool> info <path>`
pub fn parse_record_info(stdout: &str) -> Result<RecordInfo, RecordInfoError> {
    let mut begin = None;
    let mut end = None;
    for caps in TIME_RE.captures_iter(stdout) {
        let field = if &caps[1] == "begin" { "begin_time" } else { "end_time" };
        let parsed = parse_record_time(&caps[2]).map_err(|_| RecordInfoError::InvalidValue {
            field,
            value: caps[2].to_string(),
        })?;
        let slot = if field == "begin_time" { &mut begin } else { &mut end };
        if slot.is_none() {
            *slot = Some(parsed);
        }
    }
    let begin = begin.ok_or(RecordInfoError::MissingField("begin_time"))?;
    let end = end.ok_or(RecordInfoError::MissingField("end_time"))?;

    let raw_duration = DURATION_RE
        .captures(stdout)
        .map(|c| c[1].to_string())
        .ok_or(RecordInfoError::MissingField("duration"))?;
    let duration = raw_duration
        .parse::<f64>()
        .map(|d| d.floor() as i64)
        .map_err(|_| RecordInfoError::InvalidValue {
            field: "duration",
            value: raw_duration.clone(),
        })?;

    let mut channels: Vec<ChannelStat> = CHANNEL_RE
        .captures_iter(stdout)
        .filter_map(|c| {
            Some(ChannelStat {
                name: c[1].to_string(),
                messages: c[2].parse().ok()?,
            })
        })
        .collect();
    channels.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(RecordInfo {
        begin,
        end,
        duration,
        channels,
    })
}

/// Runs `info` through an execution backend
pub struct RecordInspector {
    backend: Arc<dyn ExecutionBackend>,
    tool: String,
}

impl RecordInspector {
    pub fn new(backend: Arc<dyn ExecutionBackend>, tool: impl Into<String>) -> Self {
        Self {
            backend,
            tool: tool.into(),
        }
    }

    /// Inspect a fragment file or a directory of fragments
    pub async fn info(&self, host_path: &Path) -> SyncResult<RecordInfo> {
        let mapped = self.backend.map_path(host_path)?;
        let command = format!("{} info {}", self.tool, quote_arg(&mapped)?);
        let stdout = self.backend.execute(&command).await.map_err(|e| {
            tracing::error!(path = %host_path.display(), error = %e, "Record info failed");
            e
        })?;
        Ok(parse_record_info(&stdout)?)
    }
}
