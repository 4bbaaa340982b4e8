//! Sync pipeline: manifest tasks in, sliced fragments and contracts out
//!
//! A run flattens the selected tasks into fragment jobs, checks that the
//! destination volume can hold them, then slices one fragment at a time in
//! manifest order. When the last job of a (task, partition) group is done the
//! group is post-processed once: contract merge, `version.json` carry-over,
//! README.
//!
//! Containment:
//! - corrupt fragment: skipped, the group continues
//! - backend failure: the task's remaining fragments are abandoned, the run continues;
//!   fragments of the group already complete on disk stay in the contract
//! - capacity or bad task time: the run stops before any directory is touched
//!
//! Fragments already on disk stay there whatever happens later.

use crate::backend::{BackendError, ExecutionBackend};
use crate::error::{SyncError, SyncResult};
use crate::services::contract::{ContractMerger, CONTRACT_FILE_NAME};
use crate::services::manifest::Task;
use crate::services::readme::{self, README_FILE_NAME};
use crate::services::slicer::{SliceOrchestrator, SliceOutcome};
use crate::services::time_window::{tag_window, TagWindow};
use rtag_common::config::{DirPolicy, RunConfig};
use rtag_common::events::{EventBus, SyncEvent};
use rtag_common::fsutil::{atomic_write, available_space};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Suffix appended to a source name to form its destination name
pub const SLICE_SUFFIX: &str = ".split";

/// Sidecar copied next to sliced fragments when present beside the source
pub const VERSION_FILE_NAME: &str = "version.json";

/// Source suffixes marking intermediate artifacts that are removed once sliced
const INTERMEDIATE_SUFFIXES: &[&str] = &[".split", ".sliced", ".lean"];

/// Free space query, injectable for tests
pub trait DiskSpace: Send + Sync {
    /// Bytes available for writing at `path`
    fn available(&self, path: &Path) -> SyncResult<u64>;
}

/// Free space of the real volume
pub struct VolumeSpace;

impl DiskSpace for VolumeSpace {
    fn available(&self, path: &Path) -> SyncResult<u64> {
        Ok(available_space(path)?)
    }
}

/// Monotonic progress over a fixed byte total
///
/// Committed bytes only grow; in-flight samples may come and go, so the
/// reported fraction is the running maximum in parts per million.
pub struct ProgressTracker {
    total: u64,
    committed: AtomicU64,
    best_ppm: AtomicU64,
}

const PPM: u64 = 1_000_000;

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            committed: AtomicU64::new(0),
            best_ppm: AtomicU64::new(0),
        }
    }

    /// Record bytes of a finished fragment; returns the new fraction if it grew
    pub fn commit(&self, bytes: u64) -> Option<f64> {
        self.committed.fetch_add(bytes, Ordering::SeqCst);
        self.observe(0)
    }

    /// Sample with `in_flight` bytes of the current fragment written so far
    pub fn observe(&self, in_flight: u64) -> Option<f64> {
        let ppm = if self.total == 0 {
            PPM
        } else {
            let done = self
                .committed
                .load(Ordering::SeqCst)
                .saturating_add(in_flight)
                .min(self.total);
            ((done as u128 * PPM as u128) / self.total as u128) as u64
        };
        let previous = self.best_ppm.fetch_max(ppm, Ordering::SeqCst);
        (ppm > previous).then(|| ppm as f64 / PPM as f64)
    }

    pub fn fraction(&self) -> f64 {
        self.best_ppm.load(Ordering::SeqCst) as f64 / PPM as f64
    }

    pub fn processed_bytes(&self) -> u64 {
        self.committed.load(Ordering::SeqCst).min(self.total)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// A task that stopped early
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub task_name: String,
    pub error: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub total_bytes: u64,
    /// Fragments sliced in this run
    pub sliced: usize,
    /// Fragments already complete on disk
    pub resumed: usize,
    /// Sources skipped as corrupt
    pub corrupt_skipped: Vec<String>,
    /// (task, partition) groups post-processed
    pub completed_groups: usize,
    pub failed_tasks: Vec<TaskFailure>,
    /// Intermediate sources removed after slicing
    pub cleaned: usize,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed_tasks.is_empty() && !self.cancelled
    }
}

/// One source fragment bound for one destination
#[derive(Debug, Clone)]
struct FragmentJob {
    task_index: usize,
    partition: String,
    source: PathBuf,
    /// First source of this job's group; its directory may hold a version.json
    group_first: PathBuf,
    dir: PathBuf,
    dest: PathBuf,
    dest_name: String,
    expected: u64,
}

impl FragmentJob {
    fn same_group(&self, other: &FragmentJob) -> bool {
        self.task_index == other.task_index && self.partition == other.partition
    }
}

enum JobResult {
    /// Destination already complete from an earlier run
    Resumed,
    Slice(SliceOutcome),
}

impl JobResult {
    fn label(&self) -> &'static str {
        match self {
            JobResult::Resumed => SliceOutcome::Success.label(),
            JobResult::Slice(outcome) => outcome.label(),
        }
    }
}

/// Drives a sync run
pub struct SyncPipeline {
    config: Arc<RunConfig>,
    backend: Arc<dyn ExecutionBackend>,
    slicer: SliceOrchestrator,
    merger: ContractMerger,
    disk: Arc<dyn DiskSpace>,
    events: EventBus,
    cancel: CancellationToken,
}

impl SyncPipeline {
    pub fn new(config: Arc<RunConfig>, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            slicer: SliceOrchestrator::new(backend.clone(), config.backend.tool.clone()),
            merger: ContractMerger::new(&config),
            config,
            backend,
            disk: Arc::new(VolumeSpace),
            events: EventBus::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_disk_space(mut self, disk: Arc<dyn DiskSpace>) -> Self {
        self.disk = disk;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Sync `tasks`, dropping `blacklist` channels from every slice
    pub async fn sync(&self, tasks: &[Task], blacklist: &[String]) -> SyncResult<SyncReport> {
        let windows = tasks
            .iter()
            .map(|t| {
                t.tag_time()
                    .map(|time| tag_window(time, self.config.before, self.config.after))
                    .map_err(|e| SyncError::UserInput(format!("Task {} ({}): {}", t.id, t.name, e)))
            })
            .collect::<SyncResult<Vec<TagWindow>>>()?;

        let mut jobs = self.expand(tasks);
        if jobs.is_empty() {
            tracing::warn!("Nothing to sync: no task has source fragments");
            return Ok(SyncReport::default());
        }

        for job in &mut jobs {
            job.expected = match tokio::fs::metadata(&job.source).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::warn!(file = %job.source.display(), error = %e, "Cannot stat source, counting 0 bytes");
                    0
                }
            };
        }
        let total: u64 = jobs.iter().map(|j| j.expected).sum();
        self.check_capacity(total)?;

        if !blacklist.is_empty() {
            tracing::info!(channels = %blacklist.join(","), "Dropping channels while slicing");
        }
        tracing::info!(
            fragments = jobs.len(),
            total_bytes = total,
            backend = self.backend.name(),
            "Starting sync"
        );
        self.events.emit_lossy(SyncEvent::RunStarted {
            task_count: tasks.len(),
            total_bytes: total,
            timestamp: rtag_common::time::now(),
        });

        let keep = expected_entries(&jobs);
        let progress = ProgressTracker::new(total);
        let mut report = SyncReport {
            total_bytes: total,
            ..Default::default()
        };

        let mut prepared: HashSet<PathBuf> = HashSet::new();
        let mut started: HashSet<usize> = HashSet::new();
        let mut failed: HashSet<usize> = HashSet::new();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;

        for (i, job) in jobs.iter().enumerate() {
            let task = &tasks[job.task_index];
            let last_in_group = jobs.get(i + 1).map_or(true, |next| !next.same_group(job));

            if self.cancel.is_cancelled() {
                tracing::warn!(task = %task.name, "Sync cancelled");
                if group_open && i > 0 && !failed.contains(&job.task_index) {
                    let owner = &jobs[i - 1];
                    self.keep_synced(owner, &jobs[i..], &mut group).await;
                    self.finish_group(tasks, owner, &group, &mut report, &mut failed)
                        .await;
                }
                report.cancelled = true;
                break;
            }

            if failed.contains(&job.task_index) {
                self.advance(&progress, job.expected);
                if last_in_group {
                    group.clear();
                    group_open = false;
                }
                continue;
            }

            if started.insert(job.task_index) {
                self.events.emit_lossy(SyncEvent::TaskStarted {
                    task_id: task.id.clone(),
                    task_name: task.name.clone(),
                    fragment_count: jobs.iter().filter(|j| j.task_index == job.task_index).count(),
                });
            }
            group_open = true;

            let mut result = None;
            if prepared.insert(job.dir.clone()) {
                if let Err(e) = self.prepare(&job.dir, keep.get(&job.dir)).await {
                    let error = std::io::Error::new(
                        e.kind(),
                        format!("Cannot prepare {}: {}", job.dir.display(), e),
                    );
                    result = Some(JobResult::Slice(SliceOutcome::Fatal(BackendError::Io(error))));
                }
            }
            let result = match result {
                Some(r) => r,
                None => self.process(job, &windows[job.task_index], blacklist, &progress).await,
            };

            let label = result.label();
            match result {
                JobResult::Resumed => {
                    report.resumed += 1;
                    group.push(job.dest_name.clone());
                    if self.cleanup_intermediate(&job.source).await {
                        report.cleaned += 1;
                    }
                }
                JobResult::Slice(SliceOutcome::Success) => {
                    report.sliced += 1;
                    group.push(job.dest_name.clone());
                    if self.cleanup_intermediate(&job.source).await {
                        report.cleaned += 1;
                    }
                }
                JobResult::Slice(SliceOutcome::CorruptSkipped { .. }) => {
                    report.corrupt_skipped.push(job.source.display().to_string());
                }
                JobResult::Slice(SliceOutcome::Fatal(e)) => {
                    let error = e.to_string();
                    tracing::error!(
                        task = %task.name,
                        file = %job.source.display(),
                        error = %error,
                        "Task aborted, continuing with the next task"
                    );
                    // Fragments of the group left untouched this run stay in the contract
                    self.keep_synced(job, &jobs[i + 1..], &mut group).await;
                    if !group.is_empty() {
                        self.finish_group(tasks, job, &group, &mut report, &mut failed)
                            .await;
                    }
                    group.clear();
                    group_open = false;
                    if failed.insert(job.task_index) {
                        report.failed_tasks.push(TaskFailure {
                            task_id: task.id.clone(),
                            task_name: task.name.clone(),
                            error: error.clone(),
                        });
                    }
                    self.events.emit_lossy(SyncEvent::TaskFailed {
                        task_id: task.id.clone(),
                        error,
                    });
                    self.events.emit_lossy(SyncEvent::FragmentFinished {
                        task_id: task.id.clone(),
                        partition: job.partition.clone(),
                        fragment: job.dest_name.clone(),
                        outcome: label.to_string(),
                    });
                    self.advance(&progress, job.expected);
                    continue;
                }
            }

            self.events.emit_lossy(SyncEvent::FragmentFinished {
                task_id: task.id.clone(),
                partition: job.partition.clone(),
                fragment: job.dest_name.clone(),
                outcome: label.to_string(),
            });
            self.advance(&progress, job.expected);

            if last_in_group {
                self.finish_group(tasks, job, &group, &mut report, &mut failed)
                    .await;
                group.clear();
                group_open = false;
            }
        }

        tracing::info!(
            sliced = report.sliced,
            resumed = report.resumed,
            corrupt = report.corrupt_skipped.len(),
            failed = report.failed_tasks.len(),
            "Sync finished"
        );
        self.events.emit_lossy(SyncEvent::RunCompleted {
            completed_tasks: started.len().saturating_sub(failed.len()),
            failed_tasks: report.failed_tasks.len(),
            cancelled: report.cancelled,
            timestamp: rtag_common::time::now(),
        });
        Ok(report)
    }

    /// Flatten tasks into jobs, task order then partition then fragment order
    fn expand(&self, tasks: &[Task]) -> Vec<FragmentJob> {
        let mut jobs = Vec::new();
        for (task_index, task) in tasks.iter().enumerate() {
            let groups = task.partitions(&self.config.partitions, &self.config.default_partition);
            for (partition, paths) in groups {
                if paths.is_empty() {
                    continue;
                }
                let dir = self.config.partition_dir(&task.id, &task.name, &partition);
                let group_first = PathBuf::from(&paths[0]);
                for path in paths {
                    let source = PathBuf::from(&path);
                    let base = source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.clone());
                    let dest_name = format!("{}{}", base, SLICE_SUFFIX);
                    jobs.push(FragmentJob {
                        task_index,
                        partition: partition.clone(),
                        dest: dir.join(&dest_name),
                        dir: dir.clone(),
                        group_first: group_first.clone(),
                        source,
                        dest_name,
                        expected: 0,
                    });
                }
            }
        }
        jobs
    }

    fn check_capacity(&self, total: u64) -> SyncResult<()> {
        let work_dir = self.config.work_dir();
        let free = self.disk.available(&work_dir)?;
        let margin = self.config.free_space_margin;
        let usable = free.saturating_sub(margin);
        if total > usable {
            tracing::error!(
                required = total,
                available = free,
                margin,
                dest = %work_dir.display(),
                "Not enough free space for this sync"
            );
            return Err(SyncError::Capacity {
                required: total,
                available: usable,
                margin,
            });
        }
        Ok(())
    }

    async fn prepare(&self, dir: &Path, keep: Option<&HashSet<String>>) -> std::io::Result<()> {
        let policy = self.config.dir_policy;
        let dir = dir.to_path_buf();
        let keep = keep.cloned();
        match tokio::task::spawn_blocking(move || prepare_dir(policy, &dir, keep.as_ref())).await {
            Ok(result) => result,
            Err(e) => Err(join_error(e)),
        }
    }

    /// Destination present with the source's size
    async fn is_synced(&self, job: &FragmentJob) -> bool {
        if !tokio::fs::try_exists(&job.dest).await.unwrap_or(false) {
            return false;
        }
        matches!(self.backend.stat(&job.dest).await, Ok(size) if size == job.expected)
    }

    /// Add the fragments of `owner`'s group among `rest` that are already complete
    async fn keep_synced(&self, owner: &FragmentJob, rest: &[FragmentJob], group: &mut Vec<String>) {
        for job in rest.iter().take_while(|j| j.same_group(owner)) {
            if self.is_synced(job).await {
                tracing::debug!(file = %job.dest_name, "Keeping fragment synced by an earlier run");
                group.push(job.dest_name.clone());
            }
        }
    }

    async fn process(
        &self,
        job: &FragmentJob,
        window: &TagWindow,
        blacklist: &[String],
        progress: &ProgressTracker,
    ) -> JobResult {
        if self.is_synced(job).await {
            tracing::info!(file = %job.dest_name, "Already synced, skipping");
            return JobResult::Resumed;
        }

        let slice = self.slicer.slice(&job.source, &job.dest, window, blacklist);
        tokio::pin!(slice);
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        let outcome = loop {
            tokio::select! {
                outcome = &mut slice => break outcome,
                _ = ticker.tick() => {
                    let written = self.backend.stat(&job.dest).await.unwrap_or(0);
                    if let Some(fraction) = progress.observe(written.min(job.expected)) {
                        self.emit_progress(progress, fraction);
                    }
                }
            }
        };

        JobResult::Slice(outcome)
    }

    fn advance(&self, progress: &ProgressTracker, bytes: u64) {
        if let Some(fraction) = progress.commit(bytes) {
            self.emit_progress(progress, fraction);
        }
    }

    fn emit_progress(&self, progress: &ProgressTracker, fraction: f64) {
        self.events.emit_lossy(SyncEvent::Progress {
            fraction,
            processed_bytes: progress.processed_bytes(),
            total_bytes: progress.total(),
        });
    }

    /// Remove an intermediate source once its destination is complete; never fails the run
    async fn cleanup_intermediate(&self, source: &Path) -> bool {
        let name = source.to_string_lossy();
        if !INTERMEDIATE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return false;
        }
        match self.backend.remove(source).await {
            Ok(()) => {
                tracing::debug!(file = %source.display(), "Removed intermediate source");
                true
            }
            Err(e) => {
                tracing::warn!(file = %source.display(), error = %e, "Failed to remove intermediate source");
                false
            }
        }
    }

    /// Post-process one (task, partition) group
    async fn finish_group(
        &self,
        tasks: &[Task],
        job: &FragmentJob,
        fragments: &[String],
        report: &mut SyncReport,
        failed: &mut HashSet<usize>,
    ) {
        let task = &tasks[job.task_index];
        let outcome = tokio::task::spawn_blocking({
            let config = self.config.clone();
            let merger = self.merger.clone();
            let task = task.clone();
            let job = job.clone();
            let fragments = fragments.to_vec();
            move || post_process(&config, &merger, &task, &job, &fragments)
        })
        .await;
        let outcome = match outcome {
            Ok(result) => result,
            Err(e) => Err(SyncError::Io(join_error(e))),
        };
        match outcome {
            Ok(()) => {
                report.completed_groups += 1;
                tracing::info!(
                    task = %task.name,
                    partition = %job.partition,
                    dir = %job.dir.display(),
                    fragments = fragments.len(),
                    "Tag partition complete"
                );
                self.events.emit_lossy(SyncEvent::TaskCompleted {
                    task_id: task.id.clone(),
                    fragments: fragments.len(),
                });
            }
            Err(e) => {
                tracing::error!(task = %task.name, partition = %job.partition, error = %e, "Post-processing failed");
                if failed.insert(job.task_index) {
                    report.failed_tasks.push(TaskFailure {
                        task_id: task.id.clone(),
                        task_name: task.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Contract merge, `version.json` carry-over and README for one group
///
/// Blocking: takes the tag directory lock and writes files.
fn post_process(
    config: &RunConfig,
    merger: &ContractMerger,
    task: &Task,
    job: &FragmentJob,
    fragments: &[String],
) -> SyncResult<()> {
    let tag_dir = job.dir.parent().unwrap_or(&job.dir);
    merger.merge(&tag_dir.join(CONTRACT_FILE_NAME), task, &job.partition, fragments)?;

    let version_dest = job.dir.join(VERSION_FILE_NAME);
    let version_src = job
        .group_first
        .parent()
        .map(|d| d.join(VERSION_FILE_NAME))
        .filter(|p| p.is_file());
    match version_src {
        Some(version_src) => {
            if let Err(e) = std::fs::copy(&version_src, &version_dest) {
                tracing::warn!(file = %version_src.display(), error = %e, "Failed to copy version.json");
            }
        }
        None => match std::fs::remove_file(&version_dest) {
            Ok(()) => {
                tracing::debug!(file = %version_dest.display(), "Removed version.json no longer at the source");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        },
    }
    let version = std::fs::read_to_string(&version_dest).ok();

    let relative = job.dir.strip_prefix(&config.dest_root).unwrap_or(&job.dir);
    let data_path = if config.nas_root.is_empty() {
        job.dir.display().to_string()
    } else {
        format!(
            "{}/{}",
            config.nas_root.trim_end_matches('/'),
            relative.display()
        )
    };

    let text = readme::render(
        task,
        fragments,
        version.as_deref(),
        &data_path,
        config.window_secs(),
    );
    atomic_write(&job.dir.join(README_FILE_NAME), text.as_bytes())?;
    Ok(())
}

/// Apply the directory policy to `dir`, then make sure it exists
fn prepare_dir(policy: DirPolicy, dir: &Path, keep: Option<&HashSet<String>>) -> std::io::Result<()> {
    match policy {
        DirPolicy::Recreate => {
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
            }
        }
        DirPolicy::Prune => {
            if dir.is_dir() {
                for entry in std::fs::read_dir(dir)? {
                    let entry = entry?;
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let wanted = name == README_FILE_NAME
                        || name == VERSION_FILE_NAME
                        || keep.map_or(false, |k| k.contains(&name));
                    if wanted {
                        continue;
                    }
                    tracing::debug!(file = %entry.path().display(), "Pruning stale entry");
                    if entry.file_type()?.is_dir() {
                        std::fs::remove_dir_all(entry.path())?;
                    } else {
                        std::fs::remove_file(entry.path())?;
                    }
                }
            }
        }
    }
    std::fs::create_dir_all(dir)
}

fn join_error(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("Task join error: {}", e))
}

/// Destination file names expected per directory in this run
fn expected_entries(jobs: &[FragmentJob]) -> HashMap<PathBuf, HashSet<String>> {
    let mut keep: HashMap<PathBuf, HashSet<String>> = HashMap::new();
    for job in jobs {
        keep.entry(job.dir.clone())
            .or_default()
            .insert(job.dest_name.clone());
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let progress = ProgressTracker::new(200);
        assert_eq!(progress.observe(50), Some(0.25));
        // A smaller in-flight sample never moves progress backwards
        assert_eq!(progress.observe(10), None);
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(progress.commit(100), Some(0.5));
        assert_eq!(progress.commit(100), Some(1.0));
        assert_eq!(progress.processed_bytes(), 200);
    }

    #[test]
    fn test_progress_caps_at_total() {
        let progress = ProgressTracker::new(100);
        progress.commit(80);
        assert_eq!(progress.observe(500), Some(1.0));
    }

    #[test]
    fn test_progress_empty_total_is_complete() {
        let progress = ProgressTracker::new(0);
        assert_eq!(progress.commit(0), Some(1.0));
    }

    #[test]
    fn test_resumed_job_reports_success() {
        assert_eq!(JobResult::Resumed.label(), "success");
        let corrupt = JobResult::Slice(SliceOutcome::CorruptSkipped {
            output: "header invalid".to_string(),
        });
        assert_eq!(corrupt.label(), "corrupt_skipped");
    }

    #[test]
    fn test_prune_keeps_sidecars_and_expected_fragments() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("soc1");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["a.record.00001.split", "stale.split", README_FILE_NAME, VERSION_FILE_NAME] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let keep: HashSet<String> = ["a.record.00001.split".to_string()].into();

        prepare_dir(DirPolicy::Prune, &dir, Some(&keep)).unwrap();

        let mut left: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec![README_FILE_NAME, "a.record.00001.split", VERSION_FILE_NAME]);

        prepare_dir(DirPolicy::Recreate, &dir, Some(&keep)).unwrap();
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_report_success() {
        let mut report = SyncReport::default();
        assert!(report.is_success());
        report.cancelled = true;
        assert!(!report.is_success());
    }
}
