//! Fragment slicing through the record tool's `split` command
//!
//! One call cuts one source fragment down to a tag window. Failures whose
//! output carries a known corruption signature are downgraded to a skip;
//! anything else is fatal for the owning task.

use crate::backend::{quote_arg, BackendError, ExecutionBackend};
use crate::services::time_window::TagWindow;
use rtag_common::time::format_record_time;
use std::path::Path;
use std::sync::Arc;

/// Error text emitted by the record tool for unreadable fragments
///
/// Matched case-insensitively against the combined stderr/stdout.
pub const CORRUPTION_SIGNATURES: &[&str] = &[
    "parse section message failed",
    "parse section failed",
    "read chunk body section fail",
    "not a valid record file",
    "header invalid",
    "invalid header",
];

/// Result of slicing one fragment
#[derive(Debug)]
pub enum SliceOutcome {
    Success,
    /// Source is corrupt; the fragment is dropped and the task continues
    CorruptSkipped { output: String },
    /// Any other failure; the task's remaining fragments are abandoned
    Fatal(BackendError),
}

impl SliceOutcome {
    /// Label used in events and reports
    pub fn label(&self) -> &'static str {
        match self {
            SliceOutcome::Success => "success",
            SliceOutcome::CorruptSkipped { .. } => "corrupt_skipped",
            SliceOutcome::Fatal(_) => "fatal",
        }
    }
}

/// Whether backend output matches a known corruption signature
pub fn is_corruption(output: &str) -> bool {
    let lowered = output.to_lowercase();
    CORRUPTION_SIGNATURES.iter().any(|sig| lowered.contains(sig))
}

/// Issues `split` commands
pub struct SliceOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
    tool: String,
}

impl SliceOrchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, tool: impl Into<String>) -> Self {
        Self {
            backend,
            tool: tool.into(),
        }
    }

    /// Build `<tool> split -f <in> -o <out> -b "<start>" -e "<end>" [-k <channel>]*`
    pub fn build_command(
        &self,
        source: &Path,
        dest: &Path,
        window: &TagWindow,
        blacklist: &[String],
    ) -> Result<String, BackendError> {
        let mut parts = vec![
            format!("{} split", self.tool),
            format!("-f {}", quote_arg(&self.backend.map_path(source)?)?),
            format!("-o {}", quote_arg(&self.backend.map_path(dest)?)?),
            format!("-b \"{}\"", format_record_time(&window.start)),
            format!("-e \"{}\"", format_record_time(&window.end)),
        ];
        for channel in blacklist {
            parts.push(format!("-k {}", quote_arg(channel)?));
        }
        Ok(parts.join(" "))
    }

    /// Slice `source` into `dest`, overwriting any previous output
    pub async fn slice(
        &self,
        source: &Path,
        dest: &Path,
        window: &TagWindow,
        blacklist: &[String],
    ) -> SliceOutcome {
        let file = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let command = match self.build_command(source, dest, window, blacklist) {
            Ok(command) => command,
            Err(e) => return SliceOutcome::Fatal(e),
        };

        tracing::info!(
            file = %file,
            start = %format_record_time(&window.start),
            end = %format_record_time(&window.end),
            blacklisted = blacklist.len(),
            "Slicing fragment"
        );

        match self.backend.execute(&command).await {
            Ok(_) => SliceOutcome::Success,
            Err(BackendError::RuntimeFailure { output, .. }) if is_corruption(&output) => {
                tracing::warn!(file = %file, "Corrupt fragment skipped");
                SliceOutcome::CorruptSkipped { output }
            }
            Err(e) => SliceOutcome::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures_match_case_insensitively() {
        assert!(is_corruption("E1227 record_reader.cc:42] Header invalid, skip"));
        assert!(is_corruption("Parse section message failed at offset 12"));
        assert!(is_corruption("xx invalid header yy"));
        assert!(!is_corruption("No space left on device"));
        assert!(!is_corruption(""));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SliceOutcome::Success.label(), "success");
        assert_eq!(
            SliceOutcome::CorruptSkipped {
                output: String::new()
            }
            .label(),
            "corrupt_skipped"
        );
    }
}
