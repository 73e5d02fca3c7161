use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "site.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub default_object: String,
    pub default_theme: String,
    pub site_name: String,
    pub mail_from: String,
    pub debug: bool,
    pub session_ttl_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/site.db".into(),
            default_object: "Home".into(),
            default_theme: "Simple".into(),
            site_name: "Site".into(),
            mail_from: "noreply@localhost".into(),
            debug: false,
            session_ttl_seconds: 60 * 60 * 24 * 14,
        }
    }
}

impl Settings {
    /// The tracing filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat keys of the settings file, then the environment.
pub(crate) fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    apply(&mut settings, &key, value);
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    for (var, key) in [
        ("SITE_BIND", "bind_addr"),
        ("APP__BIND_ADDR", "bind_addr"),
        ("DATABASE_URL", "database_url"),
        ("APP__DATABASE_URL", "database_url"),
        ("APP__DEFAULT_OBJECT", "default_object"),
        ("APP__DEFAULT_THEME", "default_theme"),
        ("APP__SITE_NAME", "site_name"),
        ("APP__MAIL_FROM", "mail_from"),
        ("APP__DEBUG", "debug"),
        ("APP__SESSION_TTL_SECONDS", "session_ttl_seconds"),
    ] {
        if let Some(value) = env(var) {
            apply(&mut settings, key, value);
        }
    }

    settings.database_url = normalize_database_url(&settings.database_url);
    settings
}

fn apply(settings: &mut Settings, key: &str, value: String) {
    match key {
        "bind_addr" => settings.bind_addr = value,
        "database_url" => settings.database_url = value,
        "default_object" => settings.default_object = value,
        "default_theme" => settings.default_theme = value,
        "site_name" => settings.site_name = value,
        "mail_from" => settings.mail_from = value,
        "debug" => settings.debug = matches!(value.trim(), "1" | "true" | "yes" | "on"),
        "session_ttl_seconds" => match value.trim().parse() {
            Ok(ttl) => settings.session_ttl_seconds = ttl,
            Err(_) => warn!(%value, "session_ttl_seconds is not a number"),
        },
        _ => warn!(key, "unknown settings key"),
    }
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite:{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
