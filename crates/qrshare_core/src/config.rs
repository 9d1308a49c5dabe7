//! Configuration loading from environment variables.

use crate::constants::{DEFAULT_BLOB_DIR_NAME, DEFAULT_MAX_SHARE_SIZE, DEFAULT_PORT};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Runtime configuration for QR Share.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_path: String,
    pub blob_path: String,
    pub port: u16,
    pub max_share_size: usize,
    /// Origin used when building share URLs. Derived from the request when unset.
    pub public_url: Option<String>,
    /// Explicit listener address (`BIND`).
    pub bind: Option<String>,
    /// Keep everything in memory; nothing survives a restart.
    pub ephemeral: bool,
    pub allow_public_access: bool,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String, home: Option<&PathBuf>) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(home) = lookup("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Some(profile) = lookup("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Strip trailing slashes so `<origin>/s/<id>` never doubles a separator.
fn normalize_public_url(raw: String) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// [`Config::from_env`] passes the process environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let home = resolve_home_dir(&lookup);
        let db_path = lookup("DB_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(|value| expand_tilde(value, home.as_ref()))
            .unwrap_or_else(|| {
                let base = home.clone().unwrap_or_else(|| PathBuf::from("."));
                base.join(".cache")
                    .join("qrshare")
                    .join("db")
                    .to_string_lossy()
                    .to_string()
            });
        let blob_path = lookup("BLOB_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(|value| expand_tilde(value, home.as_ref()))
            .unwrap_or_else(|| {
                PathBuf::from(&db_path)
                    .join(DEFAULT_BLOB_DIR_NAME)
                    .to_string_lossy()
                    .to_string()
            });
        let flag = |name: &str| {
            lookup(name)
                .and_then(|value| parse_env_flag(&value))
                .unwrap_or(false)
        };

        Self {
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_share_size: lookup("MAX_SHARE_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_SHARE_SIZE),
            public_url: lookup("PUBLIC_URL").and_then(normalize_public_url),
            bind: lookup("BIND").filter(|value| !value.trim().is_empty()),
            ephemeral: flag("EPHEMERAL"),
            allow_public_access: flag("ALLOW_PUBLIC_ACCESS"),
            db_path,
            blob_path,
        }
    }
}
