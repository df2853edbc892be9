use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Upper bound on the directory walk below each install root. JDK layouts
/// put the binary at most at `<vendor>/<release>/bin/java` (macOS adds
/// `Contents/Home`), so four levels is enough.
const MAX_PROBE_DEPTH: usize = 4;

/// Scans host-specific well-known locations for candidate Java executables.
///
/// Pure discovery: candidates are not validated here, and a directory that
/// cannot be listed is skipped rather than reported. Every returned path is
/// canonicalized and the set is free of duplicates.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    roots: Vec<PathBuf>,
    use_env_hints: bool,
}

impl RuntimeProbe {
    /// Probe over the platform's conventional install roots plus the
    /// `JAVA_HOME` and `PATH` hints.
    pub fn new() -> Self {
        Self {
            roots: platform_install_roots(),
            use_env_hints: true,
        }
    }

    /// Probe over an explicit set of roots only, with environment hints
    /// disabled. Used by tests and by callers that already know where to
    /// look.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            use_env_hints: false,
        }
    }

    /// Produce the candidate executable paths. Never fails; a fully
    /// unreadable host yields an empty list.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();

        if self.use_env_hints {
            for hint in env_hint_candidates() {
                push_candidate(&mut candidates, &mut seen, hint);
            }
        }

        for root in &self.roots {
            collect_java_binaries(root, 0, &mut |path| {
                push_candidate(&mut candidates, &mut seen, path);
            });
        }

        debug!("Probe discovered {} candidate(s)", candidates.len());
        candidates
    }
}

impl Default for RuntimeProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn push_candidate(candidates: &mut Vec<PathBuf>, seen: &mut BTreeSet<PathBuf>, path: PathBuf) {
    if !path.is_file() {
        return;
    }
    let canonical = std::fs::canonicalize(&path).unwrap_or(path);
    if seen.insert(canonical.clone()) {
        candidates.push(canonical);
    }
}

fn collect_java_binaries(dir: &Path, depth: usize, found: &mut impl FnMut(PathBuf)) {
    if depth > MAX_PROBE_DEPTH {
        return;
    }

    // Unreadable directories are simply skipped.
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };

        if file_type.is_file() {
            if path.file_name().and_then(|name| name.to_str()) == Some(java_exe()) {
                found(path);
            }
        } else if file_type.is_dir() {
            collect_java_binaries(&path, depth + 1, found);
        }
    }
}

fn env_hint_candidates() -> Vec<PathBuf> {
    let mut hints = Vec::new();

    if let Some(java_home) = std::env::var_os("JAVA_HOME") {
        hints.push(PathBuf::from(java_home).join("bin").join(java_exe()));
    }

    if let Ok(path_java) = which::which("java") {
        hints.push(path_java);
    }

    hints
}

#[cfg(target_os = "linux")]
fn platform_install_roots() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from("/usr/lib/jvm"),
        PathBuf::from("/usr/java"),
        PathBuf::from("/opt/java"),
        PathBuf::from("/opt/jdk"),
    ];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".sdkman").join("candidates").join("java"));
    }
    roots
}

#[cfg(target_os = "macos")]
fn platform_install_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/Library/Java/JavaVirtualMachines")];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join("Library/Java/JavaVirtualMachines"));
        roots.push(home.join(".sdkman").join("candidates").join("java"));
    }
    roots
}

#[cfg(target_os = "windows")]
fn platform_install_roots() -> Vec<PathBuf> {
    [
        "C:\\Program Files\\Java",
        "C:\\Program Files\\Eclipse Adoptium",
        "C:\\Program Files\\Microsoft",
        "C:\\Program Files (x86)\\Java",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_install_roots() -> Vec<PathBuf> {
    Vec::new()
}

pub(crate) fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}
