//! The host-tool collaborator the database is constructed against.
//!
//! A lint runner, IDE plugin, or CLI owns the environment: where the API
//! description lives, where cached binaries may be written, and where
//! diagnostics go. The database only ever talks to that environment
//! through [`ApiClient`].

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use regex::Regex;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::model::ApiLevel;

/// Diagnostic severity passed to [`ApiClient::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Environment collaborator for [`crate::ApiDatabase`] construction.
pub trait ApiClient {
    /// Locate the canonical `api-versions.xml` description.
    fn find_api_database(&self) -> Option<PathBuf>;

    /// Writable directory for binary caches. `None` disables caching and
    /// the database parses the XML on every construction.
    fn cache_dir(&self) -> Option<PathBuf>;

    /// Diagnostic sink. The database reports cache corruption recovery and
    /// cache write failures here; it never fails construction over them.
    fn log(&self, severity: Severity, error: Option<&(dyn Error + 'static)>, message: &str);
}

/// Client backed by an Android SDK installation.
///
/// Finds the newest `platforms/android-N/data/api-versions.xml` under the
/// SDK root.
pub struct SdkClient {
    sdk_root: PathBuf,
    cache_dir: Option<PathBuf>,
}

impl SdkClient {
    pub fn new(sdk_root: impl Into<PathBuf>) -> Self {
        Self {
            sdk_root: sdk_root.into(),
            cache_dir: None,
        }
    }

    /// Resolve the SDK root from `ANDROID_HOME` or `ANDROID_SDK_ROOT`.
    pub fn from_env() -> Option<Self> {
        ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .map(PathBuf::from)
            .find(|path| path.is_dir())
            .map(Self::new)
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Walk the SDK's `platforms/` directory and pick the highest-numbered
    /// platform that ships an API description.
    pub fn discover(&self) -> Option<(PathBuf, ApiLevel)> {
        let platform_dir = Regex::new(r"^android-(\d+)$").unwrap();
        let platforms = self.sdk_root.join("platforms");

        let mut best: Option<(PathBuf, ApiLevel)> = None;
        for entry in WalkDir::new(&platforms)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(level) = platform_dir
                .captures(name)
                .and_then(|captures| captures[1].parse::<ApiLevel>().ok())
            else {
                continue;
            };
            let candidate = entry.path().join("data").join("api-versions.xml");
            if !candidate.is_file() {
                debug!("Platform {} has no API description, skipping", level);
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| level > *b) {
                best = Some((candidate, level));
            }
        }

        if let Some((ref path, level)) = best {
            debug!("Using API description for platform {}: {}", level, path.display());
        }
        best
    }

    /// The platform level of the discovered description, if any.
    pub fn platform(&self) -> Option<ApiLevel> {
        self.discover().map(|(_, level)| level)
    }
}

impl ApiClient for SdkClient {
    fn find_api_database(&self) -> Option<PathBuf> {
        self.discover().map(|(path, _)| path)
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn log(&self, severity: Severity, error: Option<&(dyn Error + 'static)>, message: &str) {
        log_via_tracing(severity, error, message);
    }
}

/// Client with fixed paths and an in-memory diagnostic buffer.
///
/// Used by the test suites to assert on exactly what the database logged,
/// and by embedders that route diagnostics into their own reporting.
pub struct RecordingClient {
    api_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    messages: Mutex<Vec<LoggedMessage>>,
}

/// One captured diagnostic.
#[derive(Debug, Clone)]
pub struct LoggedMessage {
    pub severity: Severity,
    pub message: String,
}

impl RecordingClient {
    pub fn new(api_file: Option<&Path>, cache_dir: Option<&Path>) -> Self {
        Self {
            api_file: api_file.map(Path::to_path_buf),
            cache_dir: cache_dir.map(Path::to_path_buf),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything logged so far.
    pub fn messages(&self) -> Vec<LoggedMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn is_log_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl ApiClient for RecordingClient {
    fn find_api_database(&self) -> Option<PathBuf> {
        self.api_file.clone()
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn log(&self, severity: Severity, error: Option<&(dyn Error + 'static)>, message: &str) {
        let message = match error {
            Some(error) => format!("{}: {}", message, error),
            None => message.to_string(),
        };
        self.messages
            .lock()
            .unwrap()
            .push(LoggedMessage { severity, message });
    }
}

/// Route a client diagnostic into the tracing pipeline.
pub fn log_via_tracing(severity: Severity, source: Option<&(dyn Error + 'static)>, message: &str) {
    match (severity, source) {
        (Severity::Info, _) => info!("{}", message),
        (Severity::Warning, Some(source)) => warn!("{}: {}", message, source),
        (Severity::Warning, None) => warn!("{}", message),
        (Severity::Error, Some(source)) => error!("{}: {}", message, source),
        (Severity::Error, None) => error!("{}", message),
    }
}
