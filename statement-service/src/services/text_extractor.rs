//! PDF text extraction through the external `pdftotext` tool.

use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

/// Turns uploaded file bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError>;
}

/// Runs a program with a hard timeout, capturing stdout.
#[derive(Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn execute(&self, program: &str, args: &[&str]) -> Result<Output, AppError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %program,
            args = ?args,
            timeout_secs = %self.timeout.as_secs(),
            "Executing command"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                AppError::InternalError(anyhow::anyhow!(
                    "{} timed out after {} seconds",
                    program,
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(program = %program, stderr = %stderr, "Command failed");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} could not read the file",
                program
            )));
        }

        Ok(output)
    }
}

/// A staged upload on disk, removed when dropped. Dropping also covers an
/// outer timeout cancelling the extraction mid-flight.
struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    async fn write(dir: &Path, bytes: &[u8]) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await?;
        let staged = Self {
            path: dir.join(format!("{}.pdf", Uuid::new_v4())),
        };
        tokio::fs::write(&staged.path, bytes).await?;
        Ok(staged)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove staged upload");
            }
        }
    }
}

/// Stages the upload in a scratch directory and runs
/// `pdftotext -layout <file> -`.
pub struct PdfTextExtractor {
    executor: CommandExecutor,
    scratch_dir: PathBuf,
    program: String,
}

impl PdfTextExtractor {
    pub fn new(scratch_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executor: CommandExecutor::new(timeout),
            scratch_dir: scratch_dir.into(),
            program: "pdftotext".to_string(),
        }
    }

    /// Run a different `pdftotext`-compatible binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run_pdftotext(&self, path: &Path) -> Result<String, AppError> {
        let path_arg = path.to_str().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Upload path is not valid UTF-8"))
        })?;

        let output = self
            .executor
            .execute(&self.program, &["-layout", path_arg, "-"])
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let staged = StagedUpload::write(&self.scratch_dir, bytes).await?;
        let result = self.run_pdftotext(&staged.path).await;
        drop(staged);

        match &result {
            Ok(text) => tracing::info!(
                file_name = %file_name,
                text_length = text.len(),
                "Extracted statement text"
            ),
            Err(e) => tracing::warn!(file_name = %file_name, error = %e, "Text extraction failed"),
        }

        result
    }
}
