use serde::{Deserialize, Serialize};

/// Configuration from tasker.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Relative to the data directory
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            images_dir: default_images_dir(),
        }
    }
}

fn default_images_dir() -> String {
    "images".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Seconds given to new tasks and to decomposed subtasks
    #[serde(default = "default_duration")]
    pub default_duration: u64,
    /// Name committed when an edit leaves the name empty
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        TasksConfig {
            default_duration: default_duration(),
            fallback_name: default_fallback_name(),
        }
    }
}

fn default_duration() -> u64 {
    60
}

fn default_fallback_name() -> String {
    "New task".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub decompose_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub image_poll_interval_ms: u64,
    /// Polls per attempt before the attempt counts as failed
    #[serde(default = "default_max_polls")]
    pub image_max_polls: u32,
    #[serde(default = "default_max_attempts")]
    pub image_max_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            decompose_url: None,
            image_url: None,
            timeout_secs: default_timeout_secs(),
            image_poll_interval_ms: default_poll_interval_ms(),
            image_max_polls: default_max_polls(),
            image_max_attempts: default_max_attempts(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_polls() -> u32 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when `TASKER_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tasks.default_duration, 60);
        assert_eq!(config.service.image_max_attempts, 3);
        assert_eq!(config.storage.images_dir, "images");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[tasks]
default_duration = 300

[service]
decompose_url = "http://localhost:9000/decompose"
"#,
        )
        .unwrap();
        assert_eq!(config.tasks.default_duration, 300);
        assert_eq!(config.tasks.fallback_name, "New task");
        assert_eq!(
            config.service.decompose_url.as_deref(),
            Some("http://localhost:9000/decompose")
        );
        assert_eq!(config.service.timeout_secs, 30);
    }
}
