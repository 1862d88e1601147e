//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_CUT_LIST, DEFAULT_HISTORY_LIMIT, DEFAULT_INTERACTION_CAPACITY, REDB_FILE_NAME,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Runtime configuration for an annotext engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub db_path: String,
    pub history_limit: usize,
    pub interaction_capacity: usize,
    pub cut_list: String,
    pub log_actions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            interaction_capacity: DEFAULT_INTERACTION_CAPACITY,
            cut_list: DEFAULT_CUT_LIST.to_string(),
            log_actions: false,
        }
    }
}

/// Resolve `~/` against the home directory.
fn expand_tilde(path: String) -> String {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path,
    }
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
}

fn default_db_path() -> String {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("annotext")
        .join(REDB_FILE_NAME)
        .to_string_lossy()
        .into_owned()
}

/// Interpret an on/off environment value.
///
/// `1`, `true`, `yes` and `on` enable; `0`, `false`, `no`, `off` and the
/// empty string disable. Case and surrounding whitespace are ignored; any
/// other value yields `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Whether the environment flag `name` is set to an enabling value.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or_default()
}

/// Parse a positive count, rejecting zero so bounded buffers stay usable.
fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

impl EngineConfig {
    /// Configuration from the `ANNOTEXT_*` variables; unset or unparsable
    /// values fall back to [`EngineConfig::default`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env::var("ANNOTEXT_DB_PATH")
                .map(expand_tilde)
                .unwrap_or(defaults.db_path),
            history_limit: env::var("ANNOTEXT_HISTORY_LIMIT")
                .ok()
                .and_then(|v| parse_positive(&v))
                .unwrap_or(defaults.history_limit),
            interaction_capacity: env::var("ANNOTEXT_INTERACTION_CAPACITY")
                .ok()
                .and_then(|v| parse_positive(&v))
                .unwrap_or(defaults.interaction_capacity),
            cut_list: env::var("ANNOTEXT_CUT_LIST")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.cut_list),
            log_actions: env_flag_enabled("ANNOTEXT_LOG_ACTIONS"),
        }
    }
}
