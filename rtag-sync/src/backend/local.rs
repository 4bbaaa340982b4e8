//! Host-local execution through `bash -c`

use super::{run_captured, run_inherited, wrap_env, BackendError, ExecutionBackend};
use async_trait::async_trait;
use std::path::Path;

/// Runs the record tool directly on this host
pub struct LocalBackend {
    setup_env: Option<String>,
}

impl LocalBackend {
    pub fn new(setup_env: Option<String>) -> Self {
        Self { setup_env }
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn map_path(&self, host_path: &Path) -> Result<String, BackendError> {
        Ok(host_path.to_string_lossy().into_owned())
    }

    async fn execute(&self, command: &str) -> Result<String, BackendError> {
        let wrapped = wrap_env(self.setup_env.as_deref(), command)?;
        run_captured("bash", &["-c", &wrapped], command).await
    }

    async fn execute_interactive(&self, command: &str) -> Result<(), BackendError> {
        let wrapped = wrap_env(self.setup_env.as_deref(), command)?;
        run_inherited("bash", &["-c", &wrapped], command).await
    }
}
