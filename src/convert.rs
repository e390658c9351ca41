//! External format-converter execution.
//!
//! The ADES converters terminate their own process on malformed input, so
//! they are never linked in; each conversion runs a separate OS process whose
//! only communication surface is its exit code, captured stdout/stderr, and
//! the output file. Success demands all three signals at once: a zero exit,
//! silence on both channels, and a well-formed XML file at the output path.
//! Any emitted text is treated as a failure signal even on a clean exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::document;

/// Resolves a conversion capability name to an executable path.
///
/// Returns `None` when the capability is not installed; a returned path is
/// expected to exist.
#[cfg_attr(test, mockall::automock)]
pub trait ConverterResolver: Send + Sync {
    fn resolve(&self, capability: &str) -> Option<PathBuf>;
}

/// Resolver that looks capabilities up as files in a configured directory.
pub struct DirConverterResolver {
    directory: PathBuf,
}

impl DirConverterResolver {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

impl ConverterResolver for DirConverterResolver {
    fn resolve(&self, capability: &str) -> Option<PathBuf> {
        let path = self.directory.join(capability);
        path.is_file().then_some(path)
    }
}

/// Result of one conversion attempt; consumed immediately, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub success: bool,
    pub message: String,
    /// Path of the produced XML artifact. Internal: the report serializes
    /// only the verdict and message.
    #[serde(skip)]
    pub output: Option<PathBuf>,
}

impl ConversionOutcome {
    fn succeeded(message: String, output: PathBuf) -> Self {
        Self {
            success: true,
            message,
            output: Some(output),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            output: None,
        }
    }
}

/// Runs a named conversion capability as an isolated subprocess.
pub struct ConverterRunner {
    resolver: Arc<dyn ConverterResolver>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ConverterRunner {
    pub fn new(resolver: Arc<dyn ConverterResolver>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            resolver,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Convert `input_path` to XML at `output_path` using the named
    /// capability. `label` is the human-readable name used in diagnostics.
    ///
    /// Never returns an error: launch problems, timeouts, and converter
    /// failures all fold into a failure outcome carrying the converter's own
    /// error text where available.
    pub async fn convert(
        &self,
        capability: &str,
        label: &str,
        input_path: &Path,
        output_path: &Path,
    ) -> ConversionOutcome {
        let Some(executable) = self.resolver.resolve(capability) else {
            return ConversionOutcome::failed(format!("{capability} converter script not found"));
        };

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return ConversionOutcome::failed(format!(
                    "Error during {label} conversion: {e}"
                ));
            }
        };

        tracing::info!(
            converter = capability,
            input = %input_path.display(),
            output = %output_path.display(),
            "converting {label}"
        );

        let child = Command::new(&executable)
            .arg(input_path)
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A dropped conversion future (client disconnect, timeout) must
            // reap the child rather than leave it running.
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(converter = capability, error = %e, "failed to launch converter");
                return ConversionOutcome::failed(format!("Error during {label} conversion: {e}"));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(converter = capability, error = %e, "converter wait failed");
                return ConversionOutcome::failed(format!("Error during {label} conversion: {e}"));
            }
            Err(_) => {
                return ConversionOutcome::failed(format!(
                    "{label} conversion timed out after {} seconds",
                    self.timeout.as_secs()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let clean_exit = output.status.success()
            && output_path.exists()
            && stdout.trim().is_empty()
            && stderr.trim().is_empty();

        if !clean_exit {
            return ConversionOutcome::failed(format!(
                "{label} conversion failed: {stdout}\n{stderr}"
            ));
        }

        // A clean exit can still leave a truncated or non-well-formed
        // document behind; probe it before accepting.
        let probe_path = output_path.to_path_buf();
        let probe = tokio::task::spawn_blocking(move || document::check_well_formed(&probe_path))
            .await
            .unwrap_or_else(|e| Err(e.to_string()));

        if let Err(parse_error) = probe {
            let _ = tokio::fs::remove_file(output_path).await;
            return ConversionOutcome::failed(format!(
                "{label} conversion produced invalid XML: {parse_error}"
            ));
        }

        ConversionOutcome::succeeded(
            format!("{label} conversion successful"),
            output_path.to_path_buf(),
        )
    }
}
