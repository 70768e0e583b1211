use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{ControllerSettings, DEFAULT_HTTP_TIMEOUT};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "booking.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub database_url: String,
    pub http_timeout_seconds: u64,
    pub highlight_millis: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000".into(),
            database_url: "sqlite://./data/booking.db".into(),
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT.as_secs(),
            highlight_millis: 3000,
        }
    }
}

impl Settings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            highlight_duration: Duration::from_millis(self.highlight_millis),
            ..ControllerSettings::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    database_url: Option<String>,
    http_timeout_seconds: Option<u64>,
    highlight_millis: Option<u64>,
}

/// Defaults, then `config_path` if it exists, then the process environment.
pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", config_path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", config_path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.http_timeout_seconds {
        settings.http_timeout_seconds = v;
    }
    if let Some(v) = file_cfg.highlight_millis {
        settings.highlight_millis = v;
    }
    Ok(())
}

/// The `APP__` spelling wins over the bare one when both are set.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("BOOKING_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("APP__HTTP_TIMEOUT_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.http_timeout_seconds = parsed,
            Err(_) => warn!(value = %v, "config: ignoring invalid APP__HTTP_TIMEOUT_SECONDS"),
        }
    }
    if let Some(v) = lookup("APP__HIGHLIGHT_MILLIS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.highlight_millis = parsed,
            Err(_) => warn!(value = %v, "config: ignoring invalid APP__HIGHLIGHT_MILLIS"),
        }
    }
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
