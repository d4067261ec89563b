use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::query::QueryMode;

pub const DEFAULT_SLOT: &str = "records";
pub const DEFAULT_EXPORT_FILE: &str = "tasting_records.json";
const DEFAULT_DATA_DIR: &str = ".cellar";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding the slot file.
    pub data_dir: PathBuf,
    /// Slot name; the payload lives in `<data_dir>/<slot>.json`.
    pub slot: String,
    /// Fixed file name used by export.
    pub export_file: String,
    pub query_mode: QueryMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            slot: DEFAULT_SLOT.to_string(),
            export_file: DEFAULT_EXPORT_FILE.to_string(),
            query_mode: QueryMode::Lenient,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `CELLAR_HOME` and `CELLAR_STRICT_QUERIES`.
    pub fn detect() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(home) = var("CELLAR_HOME").filter(|v| !v.trim().is_empty()) {
            settings.data_dir = PathBuf::from(home);
        }
        if let Some(flag) = var("CELLAR_STRICT_QUERIES") {
            if matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on") {
                settings.query_mode = QueryMode::Strict;
            }
        }
        settings
    }

    pub fn slot_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.slot))
    }
}

/// Log filter from `RUST_LOG`, or `default` when it is unset or unparseable.
pub fn log_filter(default: &str) -> EnvFilter {
    filter_from(env::var("RUST_LOG").ok(), default)
}

fn filter_from(directives: Option<String>, default: &str) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}
