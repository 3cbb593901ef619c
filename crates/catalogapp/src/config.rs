//! # Configuration
//!
//! Catalog configuration is managed by [`confique`], which layers values from
//! environment variables, an optional TOML file and compiled defaults.
//! The binary applies command-line overrides on top.
//!
//! ## Resolution Order
//!
//! 1. **Command line**: `--bind`, `--data-file`, `--attribute-policy`, ...
//! 2. **Environment variables**: `CATALOG_BIND`, `CATALOG_DATA_FILE`, ...
//! 3. **Config file**: the TOML file passed with `--config`.
//! 4. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `bind` | `127.0.0.1:8080` | Address the HTTP server listens on |
//! | `data_file` | platform data dir | JSON document holding both tables |
//! | `in_memory` | `false` | Keep everything in memory, ignore `data_file` |
//! | `attribute_policy` | `reject` | What to do with unknown attribute keys |
//! | `log_filter` | `info` | `tracing` env-filter directive |
//! | `log_json` | `false` | Emit logs as JSON lines |
//!
//! `catalog config` prints a commented template of this file.

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How product writes treat attribute keys their category does not define.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributePolicy {
    /// Fail the request with `InvalidAdditionalField`.
    #[default]
    Reject,
    /// Log the unknown keys and store the product anyway.
    Warn,
}

impl fmt::Display for AttributePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributePolicy::Reject => write!(f, "reject"),
            AttributePolicy::Warn => write!(f, "warn"),
        }
    }
}

impl FromStr for AttributePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(AttributePolicy::Reject),
            "warn" => Ok(AttributePolicy::Warn),
            other => Err(format!(
                "unknown attribute policy '{}', expected 'reject' or 'warn'",
                other
            )),
        }
    }
}

/// Configuration for the catalog service, stored in `catalog.toml`.
#[derive(Config, Debug, Clone)]
pub struct CatalogConfig {
    /// Address the HTTP server listens on.
    #[config(default = "127.0.0.1:8080", env = "CATALOG_BIND")]
    pub bind: String,

    /// Path of the JSON document holding categories and products.
    /// When absent, a file in the platform data directory is used.
    #[config(env = "CATALOG_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Keep all data in memory. Nothing survives a restart.
    #[config(default = false, env = "CATALOG_IN_MEMORY")]
    pub in_memory: bool,

    /// Unknown attribute keys on product writes: "reject" or "warn".
    #[config(default = "reject")]
    pub attribute_policy: AttributePolicy,

    /// Log filter directive, e.g. "info" or "catalogapp=debug,info".
    #[config(default = "info", env = "CATALOG_LOG")]
    pub log_filter: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[config(default = false, env = "CATALOG_LOG_JSON")]
    pub log_json: bool,
}

impl CatalogConfig {
    /// Load from the environment, then `file` (if given), then defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, confique::Error> {
        let mut builder = Self::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        builder.load()
    }

    /// The data file to use, falling back to the platform data directory.
    pub fn data_file(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(default_data_file)
    }

    /// A commented TOML template listing every setting and its default.
    pub fn template() -> String {
        confique::toml::template::<Self>(confique::toml::FormatOptions::default())
    }
}

/// `<platform data dir>/catalog.json`, or `./catalog.json` when the platform
/// has no home directory.
pub fn default_data_file() -> PathBuf {
    ProjectDirs::from("com", "catalog", "catalog")
        .map(|dirs| dirs.data_dir().join("catalog.json"))
        .unwrap_or_else(|| PathBuf::from("catalog.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Reject".parse::<AttributePolicy>(), Ok(AttributePolicy::Reject));
        assert_eq!(" warn ".parse::<AttributePolicy>(), Ok(AttributePolicy::Warn));
        assert!("ignore".parse::<AttributePolicy>().is_err());
    }

    #[test]
    fn policy_defaults_to_reject() {
        assert_eq!(AttributePolicy::default(), AttributePolicy::Reject);
        assert_eq!(AttributePolicy::Warn.to_string(), "warn");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "bind = \"0.0.0.0:9000\"\nattribute_policy = \"warn\"\nin_memory = true"
        )
        .unwrap();

        let config = CatalogConfig::builder().file(file.path()).load().unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.attribute_policy, AttributePolicy::Warn);
        assert!(config.in_memory);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn explicit_data_file_wins_over_platform_default() {
        let config = CatalogConfig {
            bind: "127.0.0.1:8080".into(),
            data_file: Some(PathBuf::from("/tmp/shop.json")),
            in_memory: false,
            attribute_policy: AttributePolicy::Reject,
            log_filter: "info".into(),
            log_json: false,
        };
        assert_eq!(config.data_file(), PathBuf::from("/tmp/shop.json"));
    }

    #[test]
    fn default_data_file_is_json() {
        assert_eq!(
            default_data_file().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }

    #[test]
    fn template_mentions_every_key() {
        let template = CatalogConfig::template();
        for key in [
            "bind",
            "data_file",
            "in_memory",
            "attribute_policy",
            "log_filter",
            "log_json",
        ] {
            assert!(template.contains(key), "missing {} in template", key);
        }
    }
}
