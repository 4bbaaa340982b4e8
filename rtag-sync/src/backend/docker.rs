//! Container execution through `docker exec`
//!
//! The container sees the host's data under `docker_mount`; every path handed
//! to the record tool is rewritten from `host_mount` accordingly. File
//! operations (stat, remove, copy) stay on the host.

use super::{run_captured, run_inherited, wrap_env, BackendError, ExecutionBackend};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Runs the record tool inside a long-lived container
pub struct DockerBackend {
    container: String,
    setup_env: Option<String>,
    host_mount: PathBuf,
    docker_mount: PathBuf,
}

impl DockerBackend {
    pub fn new(
        container: String,
        setup_env: Option<String>,
        host_mount: PathBuf,
        docker_mount: PathBuf,
    ) -> Self {
        Self {
            container,
            setup_env,
            host_mount: normalize(&host_mount),
            docker_mount,
        }
    }
}

/// Lexically resolve `.`/`..` and make relative paths absolute
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl ExecutionBackend for DockerBackend {
    fn name(&self) -> &str {
        "docker"
    }

    fn map_path(&self, host_path: &Path) -> Result<String, BackendError> {
        let resolved = normalize(host_path);
        let relative =
            resolved
                .strip_prefix(&self.host_mount)
                .map_err(|_| BackendError::PathOutsideMount {
                    path: host_path.display().to_string(),
                    mount: self.host_mount.display().to_string(),
                })?;
        Ok(self.docker_mount.join(relative).to_string_lossy().into_owned())
    }

    async fn execute(&self, command: &str) -> Result<String, BackendError> {
        let wrapped = wrap_env(self.setup_env.as_deref(), command)?;
        run_captured(
            "docker",
            &["exec", &self.container, "/bin/bash", "-c", &wrapped],
            command,
        )
        .await
    }

    async fn execute_interactive(&self, command: &str) -> Result<(), BackendError> {
        let wrapped = wrap_env(self.setup_env.as_deref(), command)?;
        run_inherited(
            "docker",
            &["exec", "-it", &self.container, "/bin/bash", "-c", &wrapped],
            command,
        )
        .await
    }
}
