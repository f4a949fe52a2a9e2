use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{
    api::{DEFAULT_FEED_BASE_URL, DEFAULT_FEED_PATH, DEFAULT_REQUEST_TIMEOUT},
    mapping::DEFAULT_THUMBNAIL_PREFIX,
};
use serde::Deserialize;
use storage::DEFAULT_DATABASE_URL;

pub const SETTINGS_FILE: &str = "feed.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub feed_base_url: String,
    pub feed_path: String,
    pub thumbnail_prefix: String,
    pub database_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_base_url: DEFAULT_FEED_BASE_URL.into(),
            feed_path: DEFAULT_FEED_PATH.into(),
            thumbnail_prefix: DEFAULT_THUMBNAIL_PREFIX.into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    feed_base_url: Option<String>,
    feed_path: Option<String>,
    thumbnail_prefix: Option<String>,
    database_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional settings file, then environment variables.
pub fn load_settings_from<E>(path: &Path, env: E) -> anyhow::Result<Settings>
where
    E: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        if let Some(v) = file_cfg.feed_base_url {
            settings.feed_base_url = v;
        }
        if let Some(v) = file_cfg.feed_path {
            settings.feed_path = v;
        }
        if let Some(v) = file_cfg.thumbnail_prefix {
            settings.thumbnail_prefix = v;
        }
        if let Some(v) = file_cfg.database_url {
            settings.database_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
    }

    if let Some(v) = env("FEED_BASE_URL") {
        settings.feed_base_url = v;
    }
    if let Some(v) = env("APP__FEED_BASE_URL") {
        settings.feed_base_url = v;
    }

    if let Some(v) = env("FEED_PATH") {
        settings.feed_path = v;
    }

    if let Some(v) = env("THUMBNAIL_PREFIX") {
        settings.thumbnail_prefix = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
