use anyhow::Context;
use catalogapp::config::{AttributePolicy, CatalogConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Returns the version string, with the git hash for non-release builds.
/// Format for releases: "v0.3.0"
/// Format for dev builds: "v0.3.0 (dev abc1234)"
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{} (dev {})", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "catalog",
    bin_name = "catalog",
    version = get_version(),
    disable_help_subcommand = true
)]
#[command(about = "Category and product catalog over HTTP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// TOML config file
    #[arg(short, long, global = true, env = "CATALOG_CONFIG", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, global = true, help_heading = "Options")]
    pub bind: Option<String>,

    /// JSON data file
    #[arg(long, global = true, help_heading = "Options")]
    pub data_file: Option<PathBuf>,

    /// Keep data in memory only
    #[arg(long, global = true, help_heading = "Options")]
    pub in_memory: bool,

    /// Unknown attribute keys on product writes: reject or warn
    #[arg(long, global = true, help_heading = "Options")]
    pub attribute_policy: Option<AttributePolicy>,

    /// Log filter, e.g. "debug" or "catalogapp=trace,info"
    #[arg(long = "log", global = true, help_heading = "Options")]
    pub log_filter: Option<String>,

    /// Log as JSON lines
    #[arg(long, global = true, help_heading = "Options")]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print a commented configuration template
    Config,
}

impl Cli {
    pub fn selected(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }

    /// Load the layered config and apply flags on top.
    pub fn resolve(&self) -> anyhow::Result<CatalogConfig> {
        let mut config = CatalogConfig::load(self.config.as_deref()).with_context(|| {
            match &self.config {
                Some(path) => format!("failed to load config from {}", path.display()),
                None => "failed to load config".to_string(),
            }
        })?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut CatalogConfig) {
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(path) = &self.data_file {
            config.data_file = Some(path.clone());
        }
        if self.in_memory {
            config.in_memory = true;
        }
        if let Some(policy) = self.attribute_policy {
            config.attribute_policy = policy;
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = filter.clone();
        }
        if self.json_logs {
            config.log_json = true;
        }
    }
}
