//! Test Helper Utilities
//!
//! Shared fixtures for rtag-sync integration tests: a scripted execution
//! backend, a fixed free-space source and on-disk fragment layouts.

#![allow(dead_code)]

use async_trait::async_trait;
use rtag_common::config::{ConfigOverrides, RunConfig, TomlConfig};
use rtag_sync::backend::{BackendError, ExecutionBackend};
use rtag_sync::services::DiskSpace;
use rtag_sync::SyncResult;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const TOOL: &str = "cyber_recorder";

/// Info output of a 15 s fragment with two channels
pub const INFO_CAMERA_LIDAR: &str = "record_file:    a.record.00001
version:        1.0
begin_time:     2025-12-27 16:28:05
end_time:       2025-12-27 16:28:20
duration:       15.48 Seconds
size:           1024 Bytes
channel_number: 2
channels_info:  /sensor/camera/front         150 messages: sensor.Image
                /sensor/lidar/top            150 messages: sensor.PointCloud
";

/// Scripted stand-in for the record tool
///
/// `split` copies the `-f` file to the `-o` file unless a failure was
/// scripted for the source's file name. `info` answers with canned output
/// chosen by a path substring.
#[derive(Default)]
pub struct MockBackend {
    commands: Mutex<Vec<String>>,
    interactive: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, String)>>,
    infos: Mutex<Vec<(String, String)>>,
    stats: AtomicUsize,
    splits: AtomicUsize,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `split` of the source named `file_name` fail with `output`
    pub fn fail_split(&self, file_name: &str, output: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((file_name.to_string(), output.to_string()));
    }

    /// Answer `info` on any path containing `path_part` with `stdout`
    pub fn info_for(&self, path_part: &str, stdout: &str) {
        self.infos
            .lock()
            .unwrap()
            .push((path_part.to_string(), stdout.to_string()));
    }

    /// Cancel `token` once `splits` split commands have run
    pub fn cancel_after_splits(&self, splits: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((splits, token));
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn split_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(&format!("{} split", TOOL)))
            .collect()
    }

    pub fn interactive_commands(&self) -> Vec<String> {
        self.interactive.lock().unwrap().clone()
    }

    pub fn stat_calls(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    fn split(&self, command: &str, args: &[String]) -> Result<String, BackendError> {
        let source = flag_value(args, "-f").ok_or_else(|| runtime(command, "missing -f"))?;
        let dest = flag_value(args, "-o").ok_or_else(|| runtime(command, "missing -o"))?;

        let name = Path::new(&source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let scripted = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(file, _)| *file == name)
            .map(|(_, output)| output.clone());

        let done = self.splits.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if done >= *after {
                token.cancel();
            }
        }

        if let Some(output) = scripted {
            return Err(runtime(command, &output));
        }
        std::fs::copy(&source, &dest)?;
        Ok(String::new())
    }

    fn info(&self, command: &str, args: &[String]) -> Result<String, BackendError> {
        let path = args.get(2).cloned().unwrap_or_default();
        self.infos
            .lock()
            .unwrap()
            .iter()
            .find(|(part, _)| path.contains(part.as_str()))
            .map(|(_, stdout)| stdout.clone())
            .ok_or_else(|| runtime(command, "Not a valid record file"))
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn map_path(&self, host_path: &Path) -> Result<String, BackendError> {
        Ok(host_path.to_string_lossy().into_owned())
    }

    async fn execute(&self, command: &str) -> Result<String, BackendError> {
        self.commands.lock().unwrap().push(command.to_string());
        let args = shlex::split(command)
            .ok_or_else(|| BackendError::InvalidArgument(command.to_string()))?;
        match args.get(1).map(String::as_str) {
            Some("split") => self.split(command, &args),
            Some("info") => self.info(command, &args),
            _ => Err(runtime(command, "unknown subcommand")),
        }
    }

    async fn execute_interactive(&self, command: &str) -> Result<(), BackendError> {
        self.interactive.lock().unwrap().push(command.to_string());
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<u64, BackendError> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        Ok(tokio::fs::metadata(path).await?.len())
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn runtime(command: &str, output: &str) -> BackendError {
    BackendError::RuntimeFailure {
        command: command.to_string(),
        output: output.to_string(),
    }
}

/// Free space fixed up front
pub struct FixedSpace(pub u64);

impl DiskSpace for FixedSpace {
    fn available(&self, _path: &Path) -> SyncResult<u64> {
        Ok(self.0)
    }
}

/// Run configuration writing under `dest_root`: vehicle `truck7`, date
/// `20251227`, window `[-5 s, +10 s]`, no free-space margin
pub fn run_config(dest_root: &Path) -> RunConfig {
    let mut raw = TomlConfig::default();
    raw.host.dest_root = dest_root.to_path_buf();
    raw.host.nas_root = "/nas/tags".to_string();
    raw.logic.vehicle = "truck7".to_string();
    raw.logic.target_date = Some("20251227".to_string());
    raw.sync.free_space_margin_mb = 0;
    raw.sync.poll_interval_ms = 10;
    raw.sync.lock_timeout_ms = 1000;
    RunConfig::from_toml(&raw, &ConfigOverrides::default()).unwrap()
}

/// Write a fragment of `size` bytes at `dir/partition/name`
pub fn write_fragment(dir: &Path, partition: &str, name: &str, size: usize) -> PathBuf {
    let partition_dir = dir.join(partition);
    std::fs::create_dir_all(&partition_dir).unwrap();
    let path = partition_dir.join(name);
    std::fs::write(&path, vec![b'r'; size]).unwrap();
    path
}

/// Sparse fragment reporting `len` bytes without using the space
pub fn write_sparse_fragment(dir: &Path, partition: &str, name: &str, len: u64) -> PathBuf {
    let partition_dir = dir.join(partition);
    std::fs::create_dir_all(&partition_dir).unwrap();
    let path = partition_dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(len).unwrap();
    path
}

/// One manifest line
pub fn manifest_line<P: AsRef<Path>>(time: &str, name: &str, paths: &[P]) -> String {
    let joined: Vec<String> = paths
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect();
    format!("{}|{}|{}\n", time, name, joined.join(" "))
}
