//! Execution backends
//!
//! The record tool runs somewhere else: on this host, or inside a container
//! that sees the data under a different mount point. An [`ExecutionBackend`]
//! hides that difference. It maps host paths into the execution context,
//! runs command lines there, and performs file operations on the host side.

mod docker;
mod local;

pub use docker::DockerBackend;
pub use local::LocalBackend;

use async_trait::async_trait;
use rtag_common::config::{BackendConfig, BackendKind};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Command exited non-zero; `output` is stderr followed by stdout
    #[error("Command failed: {command}: {output}")]
    RuntimeFailure { command: String, output: String },

    /// Command could not be started at all
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Host path is not visible from the execution context
    #[error("{path} is outside the mounted directory {mount}")]
    PathOutsideMount { path: String, mount: String },

    /// Argument cannot be represented on a shell command line
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),

    /// Host-side file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where and how record tool commands run
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Translate a host path into the path the execution context sees
    fn map_path(&self, host_path: &Path) -> Result<String, BackendError>;

    /// Run a shell command line and return its stdout
    async fn execute(&self, command: &str) -> Result<String, BackendError>;

    /// Run a command attached to the operator's terminal (playback)
    async fn execute_interactive(&self, command: &str) -> Result<(), BackendError>;

    /// Size in bytes of a host file
    async fn stat(&self, path: &Path) -> Result<u64, BackendError> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Remove a host file; a missing file is not an error
    async fn remove(&self, path: &Path) -> Result<(), BackendError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy a host file, returning the number of bytes written
    ///
    /// Progress can be observed by polling [`ExecutionBackend::stat`] on `dest`.
    async fn copy(&self, source: &Path, dest: &Path) -> Result<u64, BackendError> {
        Ok(tokio::fs::copy(source, dest).await?)
    }
}

/// Build the backend selected by configuration
pub fn from_config(config: &BackendConfig) -> Arc<dyn ExecutionBackend> {
    match config.kind {
        BackendKind::Local => Arc::new(LocalBackend::new(config.setup_env.clone())),
        BackendKind::Docker => Arc::new(DockerBackend::new(
            config.container.clone(),
            config.setup_env.clone(),
            config.host_mount.clone(),
            config.docker_mount.clone(),
        )),
    }
}

/// Quote one argument for a POSIX shell command line
pub fn quote_arg(arg: &str) -> Result<String, BackendError> {
    shlex::try_quote(arg)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| BackendError::InvalidArgument(format!("{:?}: {}", arg, e)))
}

/// Prefix a command with the UTF-8 locale and an optional setup script
pub(crate) fn wrap_env(setup_env: Option<&str>, command: &str) -> Result<String, BackendError> {
    let base = "export LANG=C.UTF-8 && export LC_ALL=C.UTF-8";
    match setup_env {
        Some(script) => Ok(format!("{} && source {} && {}", base, quote_arg(script)?, command)),
        None => Ok(format!("{} && {}", base, command)),
    }
}

/// Run a program to completion, capturing output
pub(crate) async fn run_captured(
    program: &str,
    args: &[&str],
    shown: &str,
) -> Result<String, BackendError> {
    tracing::debug!(program, command = %shown, "Executing");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| BackendError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(BackendError::RuntimeFailure {
        command: shown.to_string(),
        output: format!("{}{}", stderr, stdout),
    })
}

/// Run a program with inherited stdio, waiting for it to exit
pub(crate) async fn run_inherited(
    program: &str,
    args: &[&str],
    shown: &str,
) -> Result<(), BackendError> {
    tracing::debug!(program, command = %shown, "Executing interactively");

    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| BackendError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(BackendError::RuntimeFailure {
            command: shown.to_string(),
            output: format!("exit status {}", status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_arg_leaves_plain_paths() {
        assert_eq!(quote_arg("/data/a.record.00001").unwrap(), "/data/a.record.00001");
    }

    #[test]
    fn test_quote_arg_quotes_spaces() {
        let quoted = quote_arg("/data/with space/a.record").unwrap();
        assert_eq!(
            shlex::split(&quoted).unwrap(),
            vec!["/data/with space/a.record".to_string()]
        );
    }

    #[test]
    fn test_quote_arg_rejects_nul() {
        assert!(matches!(
            quote_arg("bad\0arg"),
            Err(BackendError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wrap_env_sources_setup_script() {
        let wrapped = wrap_env(Some("/apollo/setup.bash"), "cyber_recorder info x").unwrap();
        assert!(wrapped.contains("source /apollo/setup.bash && cyber_recorder info x"));
        assert!(wrapped.starts_with("export LANG=C.UTF-8"));

        let bare = wrap_env(None, "ls").unwrap();
        assert!(!bare.contains("source"));
    }

    #[tokio::test]
    async fn test_run_captured_reports_shown_command_on_failure() {
        let ok = run_captured("bash", &["-c", "echo hi"], "echo hi").await.unwrap();
        assert_eq!(ok, "hi\n");

        match run_captured("bash", &["-c", "echo oops >&2; exit 4"], "exit 4").await {
            Err(BackendError::RuntimeFailure { command, output }) => {
                assert_eq!(command, "exit 4");
                assert_eq!(output, "oops\n");
            }
            other => panic!("expected runtime failure, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = BackendConfig {
            kind: BackendKind::Local,
            tool: "cyber_recorder".to_string(),
            setup_env: None,
            container: String::new(),
            host_mount: "/media".into(),
            docker_mount: "/media".into(),
        };
        assert_eq!(from_config(&config).name(), "local");

        config.kind = BackendKind::Docker;
        config.container = "dev".to_string();
        assert_eq!(from_config(&config).name(), "docker");
    }
}
