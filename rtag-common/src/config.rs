//! Configuration loading and run configuration
//!
//! The TOML file is read once per invocation into [`TomlConfig`], CLI
//! overrides are applied, and the result is validated into an immutable
//! [`RunConfig`] that every component receives by reference.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RTAG_CONFIG`)
//! 3. User config directory (`~/.config/rtag/config.toml`), then `/etc/rtag/config.toml`
//! 4. Compiled defaults (fallback, with a warning)

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RTAG_CONFIG";

/// Directory (under the work dir) holding tool-private state
pub const STATE_DIR_NAME: &str = ".rtag";

const DEFAULT_FREE_SPACE_MARGIN_MB: u64 = 100;
const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Raw TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub host: HostSection,
    pub logic: LogicSection,
    pub sync: SyncSection,
    pub backend: BackendSection,
}

/// `[host]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Local destination root; tags land in `dest_root/<date>/<vehicle>/`
    pub dest_root: PathBuf,
    /// Shared storage root quoted in generated READMEs
    pub nas_root: String,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            dest_root: default_dest_root(),
            nas_root: String::new(),
        }
    }
}

/// `[logic]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicSection {
    pub vehicle: String,
    /// `YYYYMMDD`; today when absent
    pub target_date: Option<String>,
    /// Seconds before the tag time
    pub before: i64,
    /// Seconds after the tag time
    pub after: i64,
    /// Known partition labels, matched against path components
    pub partitions: Vec<String>,
    /// Partition for paths that match no label
    pub default_partition: String,
    /// Channels dropped while slicing when the CLI gives none
    pub blacklist: Vec<String>,
}

impl Default for LogicSection {
    fn default() -> Self {
        Self {
            vehicle: "vehicle".to_string(),
            target_date: None,
            before: 5,
            after: 10,
            partitions: vec!["soc1".to_string(), "soc2".to_string()],
            default_partition: "soc1".to_string(),
            blacklist: Vec::new(),
        }
    }
}

/// How a destination directory is prepared the first time a run touches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirPolicy {
    /// Remove entries that are not expected by this run, keep the rest
    #[default]
    Prune,
    /// Remove the directory and create it again
    Recreate,
}

/// Library cache fingerprint flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Work dir mtime plus calendar day
    #[default]
    Mtime,
    /// Hash of every contract sidecar's path, size and mtime plus calendar day
    Sidecars,
}

/// `[sync]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub free_space_margin_mb: u64,
    pub poll_interval_ms: u64,
    pub lock_timeout_ms: u64,
    pub dir_policy: DirPolicy,
    pub fingerprint: FingerprintMode,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            free_space_margin_mb: DEFAULT_FREE_SPACE_MARGIN_MB,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            dir_policy: DirPolicy::default(),
            fingerprint: FingerprintMode::default(),
        }
    }
}

/// Execution backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Docker,
}

/// `[backend]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    /// Record tool binary invoked for split/info/play
    pub tool: String,
    /// Script sourced before every command (empty = none)
    pub setup_env: String,
    pub container: String,
    pub host_mount: PathBuf,
    pub docker_mount: PathBuf,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            tool: "cyber_recorder".to_string(),
            setup_env: String::new(),
            container: String::new(),
            host_mount: PathBuf::from("/media"),
            docker_mount: PathBuf::from("/media"),
        }
    }
}

/// Resolve which config file to read
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user then system config file
    let user_config = dirs::config_dir().map(|d| d.join("rtag").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    let system_config = PathBuf::from("/etc/rtag/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load a TOML config file
///
/// A missing file is not fatal: a warning is logged and defaults are used.
/// A file that exists but does not parse is a configuration error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using compiled defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    crate::fsutil::atomic_write(path, content.as_bytes())
}

fn default_dest_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rtag"))
        .unwrap_or_else(|| PathBuf::from("./rtag_data"))
}

/// Per-invocation overrides supplied by the CLI
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dest_root: Option<PathBuf>,
    pub vehicle: Option<String>,
    pub target_date: Option<String>,
    pub before: Option<i64>,
    pub after: Option<i64>,
}

/// Execution backend settings carried into the run
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub tool: String,
    pub setup_env: Option<String>,
    pub container: String,
    pub host_mount: PathBuf,
    pub docker_mount: PathBuf,
}

/// Validated, immutable configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dest_root: PathBuf,
    pub nas_root: String,
    pub vehicle: String,
    /// `YYYYMMDD`
    pub target_date: String,
    pub before: i64,
    pub after: i64,
    pub partitions: Vec<String>,
    pub default_partition: String,
    pub blacklist: Vec<String>,
    /// Bytes kept free on the destination volume
    pub free_space_margin: u64,
    pub poll_interval: Duration,
    pub lock_timeout: Duration,
    pub dir_policy: DirPolicy,
    pub fingerprint: FingerprintMode,
    pub backend: BackendConfig,
}

impl RunConfig {
    /// Apply overrides to a raw config and validate it
    pub fn from_toml(raw: &TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let target_date = overrides
            .target_date
            .clone()
            .or_else(|| raw.logic.target_date.clone())
            .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d").to_string());

        let setup_env = Some(raw.backend.setup_env.trim().to_string()).filter(|s| !s.is_empty());

        let config = Self {
            dest_root: overrides
                .dest_root
                .clone()
                .unwrap_or_else(|| raw.host.dest_root.clone()),
            nas_root: raw.host.nas_root.clone(),
            vehicle: overrides
                .vehicle
                .clone()
                .unwrap_or_else(|| raw.logic.vehicle.clone()),
            target_date,
            before: overrides.before.unwrap_or(raw.logic.before),
            after: overrides.after.unwrap_or(raw.logic.after),
            partitions: raw.logic.partitions.clone(),
            default_partition: raw.logic.default_partition.clone(),
            blacklist: raw.logic.blacklist.clone(),
            free_space_margin: raw.sync.free_space_margin_mb.saturating_mul(1024 * 1024),
            poll_interval: millis_to_duration(raw.sync.poll_interval_ms),
            lock_timeout: millis_to_duration(raw.sync.lock_timeout_ms),
            dir_policy: raw.sync.dir_policy,
            fingerprint: raw.sync.fingerprint,
            backend: BackendConfig {
                kind: raw.backend.kind,
                tool: raw.backend.tool.clone(),
                setup_env,
                container: raw.backend.container.clone(),
                host_mount: raw.backend.host_mount.clone(),
                docker_mount: raw.backend.docker_mount.clone(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce nonsense on disk
    ///
    /// The tag window must have positive length: `before + after > 0`.
    pub fn validate(&self) -> Result<()> {
        if self.vehicle.trim().is_empty() || self.vehicle.contains('/') {
            return Err(Error::Config(format!("Invalid vehicle name: '{}'", self.vehicle)));
        }

        if self.target_date.len() != 8 || !self.target_date.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config(format!(
                "target_date must be YYYYMMDD, got '{}'",
                self.target_date
            )));
        }

        if self.before.saturating_add(self.after) <= 0 {
            return Err(Error::Config(format!(
                "Empty tag window: before={} after={} (before + after must be positive)",
                self.before, self.after
            )));
        }

        if self.partitions.iter().any(|p| p.is_empty() || p.contains('/')) {
            return Err(Error::Config("Partition labels must be non-empty path components".to_string()));
        }

        if self.default_partition.is_empty() || self.default_partition.contains('/') {
            return Err(Error::Config(format!(
                "Invalid default partition: '{}'",
                self.default_partition
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }

        if self.backend.tool.trim().is_empty() {
            return Err(Error::Config("backend.tool must not be empty".to_string()));
        }

        if self.backend.kind == BackendKind::Docker && self.backend.container.trim().is_empty() {
            return Err(Error::Config("backend.container is required for the docker backend".to_string()));
        }

        Ok(())
    }

    /// Tag window length in seconds
    pub fn window_secs(&self) -> i64 {
        self.before + self.after
    }

    /// `dest_root/<date>/<vehicle>`: the directory every tag of this run lives in
    pub fn work_dir(&self) -> PathBuf {
        self.dest_root.join(&self.target_date).join(&self.vehicle)
    }

    /// `work_dir/<id>.<name>`
    pub fn tag_dir(&self, task_id: &str, task_name: &str) -> PathBuf {
        self.work_dir().join(format!("{}.{}", task_id, task_name))
    }

    /// `work_dir/<id>.<name>/<partition>`
    pub fn partition_dir(&self, task_id: &str, task_name: &str, partition: &str) -> PathBuf {
        self.tag_dir(task_id, task_name).join(partition)
    }

    /// Tool-private state directory inside the work dir
    pub fn state_dir(&self) -> PathBuf {
        self.work_dir().join(STATE_DIR_NAME)
    }

    /// Persisted library cache envelope
    pub fn library_cache_path(&self) -> PathBuf {
        self.state_dir().join("local_library.json")
    }
}
