use std::{
    fs,
    path::{Path, PathBuf},
};

use grid::GridDefaults;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "tools.toml";
const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub banner_state_path: PathBuf,
    pub log_filter: String,
    pub active_grid: GridDefaults,
    pub completed_grid: GridDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/deadlines.db".into(),
            banner_state_path: PathBuf::from("./data/banners.json"),
            log_filter: "warn".into(),
            active_grid: GridDefaults::active(),
            completed_grid: GridDefaults::completed(),
        }
    }
}

/// Defaults, then the settings file (missing is fine), then `APP__*` and
/// `DATABASE_URL` from the environment.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => parse_settings(path, &raw)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    apply_env(&mut settings, std::env::vars())?;
    Ok(settings)
}

pub fn parse_settings(path: &Path, raw: &str) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn apply_env(
    settings: &mut Settings,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), SettingsError> {
    let mut prefixed_database_url = None;
    for (key, value) in vars {
        if key == "DATABASE_URL" {
            settings.database_url = value;
            continue;
        }
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match name {
            "DATABASE_URL" => prefixed_database_url = Some(value),
            "BANNER_STATE_PATH" => settings.banner_state_path = PathBuf::from(value),
            "LOG" => settings.log_filter = value,
            "PAGE_SIZE" => {
                let page_size = value
                    .parse::<usize>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| SettingsError::InvalidValue {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                settings.active_grid.page_size = page_size;
                settings.completed_grid.page_size = page_size;
            }
            _ => {}
        }
    }
    if let Some(url) = prefixed_database_url {
        settings.database_url = url;
    }
    Ok(())
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        return sqlite_url_for_path(path);
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url);
    sqlite_url_for_path(path)
}

/// Drive-letter paths keep a single colon after `sqlite`.
fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if has_drive {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
