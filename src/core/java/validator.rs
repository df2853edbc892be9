use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::version::JavaVersion;
use crate::core::registry::{RuntimeDescriptor, RuntimeSource};

/// Default bound on a single `java -version` invocation.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Structured rejection for a candidate executable. Never wraps a raw OS or
/// process error; the registry and the UI pattern-match on these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationRejection {
    #[error("{path} is missing or not executable")]
    NotExecutable { path: String },

    #[error("{path} did not answer the version query in time")]
    Timeout { path: String },

    #[error("{path} produced unrecognizable version output")]
    UnparseableOutput { path: String },
}

/// Confirms that a candidate path is a usable Java runtime by running its
/// version query and parsing the result.
#[derive(Debug, Clone)]
pub struct RuntimeValidator {
    timeout: Duration,
}

impl RuntimeValidator {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `<path> -version` under the configured timeout and parse the
    /// combined output into a descriptor with the given provenance.
    pub async fn validate(
        &self,
        path: &Path,
        source: RuntimeSource,
    ) -> Result<RuntimeDescriptor, ValidationRejection> {
        let display_path = path.to_string_lossy().to_string();

        let child = tokio::process::Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|_| ValidationRejection::NotExecutable {
                path: display_path.clone(),
            })?;

        // Dropping the output future on timeout kills the child via
        // `kill_on_drop`.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(_)) => {
                return Err(ValidationRejection::NotExecutable { path: display_path });
            }
            Err(_) => {
                return Err(ValidationRejection::Timeout { path: display_path });
            }
        };

        if !output.status.success() {
            return Err(ValidationRejection::UnparseableOutput { path: display_path });
        }

        // `java -version` historically writes to stderr; newer runtimes may
        // use stdout. Parse both.
        let version_output = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );
        debug!(
            "Validating {:?}: {}",
            path,
            version_output.lines().next().unwrap_or("")
        );

        let raw = parse_version_string(&version_output).ok_or_else(|| {
            ValidationRejection::UnparseableOutput {
                path: display_path.clone(),
            }
        })?;
        let version =
            JavaVersion::parse(&raw).ok_or(ValidationRejection::UnparseableOutput {
                path: display_path,
            })?;

        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(RuntimeDescriptor {
            path: canonical,
            version,
            source,
        })
    }
}

impl Default for RuntimeValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the version token from `-version` output. Primary pattern: the
/// first double-quoted token on a line mentioning "version" (both the
/// legacy `java version "1.8.0_281"` and the modern
/// `openjdk version "17.0.8"` shapes). Fallback: the unquoted second token
/// of a `java`/`openjdk` line, as printed by `java --version`.
fn parse_version_string(output: &str) -> Option<String> {
    for line in output.lines() {
        if !line.contains("version") {
            continue;
        }
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
    }

    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("java") | Some("openjdk") => {}
            _ => continue,
        }
        if let Some(token) = tokens.next() {
            if token.starts_with(|c: char| c.is_ascii_digit()) {
                return Some(token.to_string());
            }
        }
    }

    None
}

/// Normalize a user- or probe-supplied path to the form used as the unique
/// key within a scope.
pub fn normalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
