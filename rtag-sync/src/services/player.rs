//! Playback planning and launch
//!
//! A plan resolves the requested relative range against the selected
//! fragments and renders the record tool's `play` command. Library entries
//! are synchronized captures of one window (durations take the max); loose
//! files are consecutive pieces of one timeline (durations add up).

use crate::backend::{quote_arg, ExecutionBackend};
use crate::error::{SyncError, SyncResult};
use crate::services::library::{FragmentRef, LibraryEntry};
use crate::services::manifest::record_sort_key;
use crate::services::record_info::RecordInspector;
use crate::services::time_window::{playback_window, PlaybackMode, PlaybackWindow, TimelineSegment};
use chrono::NaiveDateTime;
use rtag_common::time::{format_record_time, parse_iso};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fragment placed on the playback timeline
#[derive(Debug, Clone)]
pub struct PlayItem {
    pub path: PathBuf,
    pub begin: NaiveDateTime,
    pub duration: i64,
}

impl PlayItem {
    fn from_ref(fragment: &FragmentRef) -> SyncResult<Self> {
        Ok(Self {
            path: PathBuf::from(&fragment.path),
            begin: parse_iso(&fragment.begin)?,
            duration: fragment.duration,
        })
    }
}

/// Resolved playback: window plus the command that plays it
#[derive(Debug, Clone)]
pub struct PlaybackPlan {
    pub window: PlaybackWindow,
    pub files: Vec<PathBuf>,
    pub command: String,
}

/// Plans and starts playback through an execution backend
pub struct Player {
    backend: Arc<dyn ExecutionBackend>,
    tool: String,
}

impl Player {
    pub fn new(backend: Arc<dyn ExecutionBackend>, tool: impl Into<String>) -> Self {
        Self {
            backend,
            tool: tool.into(),
        }
    }

    /// Plan playback of arbitrary timeline items
    pub fn plan(
        &self,
        items: &[PlayItem],
        start_sec: i64,
        end_sec: i64,
        mode: PlaybackMode,
        excluded: &[String],
    ) -> SyncResult<PlaybackPlan> {
        let segments: Vec<TimelineSegment> = items
            .iter()
            .map(|i| TimelineSegment {
                begin: i.begin,
                duration: i.duration,
            })
            .collect();
        let window = playback_window(&segments, start_sec, end_sec, mode)
            .ok_or_else(|| SyncError::UserInput("Nothing to play".to_string()))?;

        let mut mapped = Vec::with_capacity(items.len());
        for item in items {
            mapped.push(quote_arg(&self.backend.map_path(&item.path)?)?);
        }

        let mut parts = vec![
            format!("{} play", self.tool),
            "-l".to_string(),
            format!("-f {}", mapped.join(" ")),
            format!("-b \"{}\"", format_record_time(&window.abs_start())),
            format!("-e \"{}\"", format_record_time(&window.abs_end())),
        ];
        for channel in excluded {
            parts.push(format!("-k {}", quote_arg(channel)?));
        }

        Ok(PlaybackPlan {
            window,
            files: items.iter().map(|i| i.path.clone()).collect(),
            command: parts.join(" "),
        })
    }

    /// Plan playback of a library entry, one partition or all of them
    pub fn plan_entry(
        &self,
        entry: &LibraryEntry,
        partition: Option<&str>,
        start_sec: i64,
        end_sec: i64,
        excluded: &[String],
    ) -> SyncResult<PlaybackPlan> {
        let fragments: Vec<&FragmentRef> = match partition {
            Some(name) => entry
                .partitions
                .get(name)
                .ok_or_else(|| {
                    SyncError::UserInput(format!(
                        "Tag '{}' has no partition '{}'",
                        entry.tag, name
                    ))
                })?
                .iter()
                .collect(),
            None => entry.all_fragments(),
        };
        let items = fragments
            .into_iter()
            .map(PlayItem::from_ref)
            .collect::<SyncResult<Vec<_>>>()?;
        self.plan(&items, start_sec, end_sec, PlaybackMode::Simultaneous, excluded)
    }

    /// Plan playback of loose fragment files, reading each file's span with `info`
    pub async fn plan_files(
        &self,
        inspector: &RecordInspector,
        files: &[PathBuf],
        start_sec: i64,
        end_sec: i64,
        excluded: &[String],
    ) -> SyncResult<PlaybackPlan> {
        let mut ordered: Vec<&PathBuf> = files.iter().collect();
        ordered.sort_by_key(|p| record_sort_key(&p.to_string_lossy()));

        let mut items = Vec::with_capacity(ordered.len());
        for path in ordered {
            let info = inspector.info(path).await?;
            items.push(PlayItem {
                path: path.clone(),
                begin: info.begin,
                duration: info.duration,
            });
        }
        self.plan(&items, start_sec, end_sec, PlaybackMode::Sequential, excluded)
    }

    /// Run the planned command attached to the terminal
    pub async fn play(&self, plan: &PlaybackPlan) -> SyncResult<()> {
        let first = plan
            .files
            .first()
            .map(|p| p.as_path())
            .unwrap_or_else(|| Path::new(""));
        tracing::info!(
            first = %first.display(),
            files = plan.files.len(),
            start = plan.window.start_sec,
            end = plan.window.end_sec,
            "Starting playback"
        );
        self.backend.execute_interactive(&plan.command).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use std::collections::BTreeMap;

    fn player() -> Player {
        Player::new(Arc::new(LocalBackend::new(None)), "cyber_recorder")
    }

    fn entry() -> LibraryEntry {
        let fragment = |p: &str| FragmentRef {
            path: p.to_string(),
            begin: "2025-12-27T16:28:05".to_string(),
            duration: 15,
        };
        let mut partitions = BTreeMap::new();
        partitions.insert("soc1".to_string(), vec![fragment("/w/01.x/soc1/a.split")]);
        partitions.insert("soc2".to_string(), vec![fragment("/w/01.x/soc2/b.split")]);
        LibraryEntry {
            tag: "x".to_string(),
            time: "2025-12-27 16:28:10".to_string(),
            vehicle: "truck7".to_string(),
            date: "20251227".to_string(),
            partitions,
            last_update: BTreeMap::new(),
            dir: "/w/01.x".to_string(),
        }
    }

    #[test]
    fn test_entry_plan_all_partitions() {
        let plan = player().plan_entry(&entry(), None, 0, 0, &[]).unwrap();
        assert_eq!(plan.window.total, 15);
        assert_eq!(
            plan.command,
            "cyber_recorder play -l -f /w/01.x/soc1/a.split /w/01.x/soc2/b.split \
             -b \"2025-12-27 16:28:05\" -e \"2025-12-27 16:28:20\""
        );
    }

    #[test]
    fn test_entry_plan_one_partition_with_range_and_exclusions() {
        let plan = player()
            .plan_entry(&entry(), Some("soc2"), 3, 8, &["/mdrive/camera".to_string()])
            .unwrap();
        assert_eq!(plan.files, vec![PathBuf::from("/w/01.x/soc2/b.split")]);
        assert!(plan.command.contains("-b \"2025-12-27 16:28:08\""));
        assert!(plan.command.contains("-e \"2025-12-27 16:28:13\""));
        assert!(plan.command.ends_with("-k /mdrive/camera"));
    }

    #[test]
    fn test_inverted_range_plays_everything() {
        let plan = player().plan_entry(&entry(), None, 10, 4, &[]).unwrap();
        assert!(plan.window.reset);
        assert_eq!((plan.window.start_sec, plan.window.end_sec), (0, 15));
    }

    #[test]
    fn test_unknown_partition() {
        assert!(matches!(
            player().plan_entry(&entry(), Some("soc9"), 0, 0, &[]),
            Err(SyncError::UserInput(_))
        ));
    }

    #[test]
    fn test_empty_plan_is_error() {
        assert!(player()
            .plan(&[], 0, 0, PlaybackMode::Sequential, &[])
            .is_err());
    }
}
