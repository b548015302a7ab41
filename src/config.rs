use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::line::MAX_LINE_LENGTH;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_pop3_port")]
    pub pop3_port: u16,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Name announced in SMTP greetings
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// `name password` pairs, one per line
    #[serde(default = "default_users_file")]
    pub users_file: String,
    /// Where DATA is spooled before delivery; the system temp dir if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_pop3_port() -> u16 {
    1110
}

fn default_smtp_port() -> u16 {
    2525
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_max_line_length() -> usize {
    MAX_LINE_LENGTH
}

fn default_users_file() -> String {
    "users.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pop3_port: default_pop3_port(),
            smtp_port: default_smtp_port(),
            bind_address: default_bind_address(),
            hostname: default_hostname(),
            max_line_length: default_max_line_length(),
            users_file: default_users_file(),
            scratch_dir: None,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load() -> anyhow::Result<Self> {
        let config_paths = [
            "config.json",
            "simple-mail-server.json",
            "/etc/simple-mail-server/config.json",
        ];

        for path in &config_paths {
            if std::path::Path::new(path).exists() {
                tracing::info!("Loading configuration from: {}", path);
                return Self::from_file(path);
            }
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }
}

/// Configuration for the mailbox backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub store_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: "directory".to_string(),
            path: Some("mail".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "smtp_port": 25 }"#).unwrap();
        assert_eq!(config.smtp_port, 25);
        assert_eq!(config.pop3_port, 1110);
        assert_eq!(config.max_line_length, 1024);
        assert_eq!(config.users_file, "users.txt");
        assert_eq!(config.store.store_type, "directory");
        assert_eq!(config.store.path.as_deref(), Some("mail"));
    }

    #[test]
    fn store_section_is_parsed() {
        let config: Config = serde_json::from_str(
            r#"{ "hostname": "mx.example.com", "store": { "type": "memory" } }"#,
        )
        .unwrap();
        assert_eq!(config.hostname, "mx.example.com");
        assert_eq!(config.store.store_type, "memory");
        assert!(config.store.path.is_none());
    }
}
