use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

pub const CONFIG_FILE: &str = "tasker.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid tasker.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tasker.toml: {0}")]
    Syntax(#[from] toml_edit::TomlError),
    #[error("unknown config key {0:?}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
}

/// Keys `tk config set` accepts
const SETTABLE: &[(&str, Kind)] = &[
    ("storage.images_dir", Kind::Text),
    ("tasks.default_duration", Kind::Integer),
    ("tasks.fallback_name", Kind::Text),
    ("service.decompose_url", Kind::Text),
    ("service.image_url", Kind::Text),
    ("service.timeout_secs", Kind::Integer),
    ("service.image_poll_interval_ms", Kind::Integer),
    ("service.image_max_polls", Kind::Integer),
    ("service.image_max_attempts", Kind::Integer),
    ("log.level", Kind::Text),
];

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

fn read_text(data_dir: &Path) -> Result<String, ConfigError> {
    let path = config_path(data_dir);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ConfigError::Read { path, source }),
    }
}

/// Parsed configuration; a missing file means all defaults.
pub fn read_config(data_dir: &Path) -> Result<Config, ConfigError> {
    Ok(toml::from_str(&read_text(data_dir)?)?)
}

/// The raw document, for edits that keep comments and layout.
pub fn read_document(data_dir: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    Ok(read_text(data_dir)?.parse()?)
}

/// Write the document back after checking it still parses as a [`Config`].
pub fn write_document(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let text = doc.to_string();
    toml::from_str::<Config>(&text)?;
    let path = config_path(data_dir);
    fs::create_dir_all(data_dir).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, text).map_err(|source| ConfigError::Write { path, source })
}

/// Set a dotted key such as `tasks.default_duration`.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let kind = SETTABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let Some((section, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };

    let value = match kind {
        Kind::Text => toml_edit::value(raw),
        Kind::Integer => {
            let n: i64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    expected: "a non-negative integer",
                })?;
            toml_edit::value(n)
        }
    };

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][field] = value;
    Ok(())
}

pub fn settable_keys() -> impl Iterator<Item = &'static str> {
    SETTABLE.iter().map(|(k, _)| *k)
}
