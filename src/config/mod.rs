//! Command-line parsing, config file loading and validation.

mod file;
mod xdg;

use anyhow::{bail, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;

pub use file::{
    default_modules, load_bar_config, BarConfig, BatteryConfig, DatetimeConfig, LoadedFrom,
    MemoryConfig, ModuleConfig, NetworkConfig, TextConfig, DEFAULT_NETWORK_PATTERN,
    DEFAULT_TEXT_CONTENT,
};
pub use xdg::{
    config_file_candidates, resolve_config_path, ConfigSource, CONFIG_FILE_NAME, NO_CONFIG,
};

use crate::theme::ThemeVariant;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("duplicate module name `{0}`; give each instance a distinct `name`")]
    DuplicateName(String),
}

/// CLI options for rsbar. Module layout lives in the YAML config file.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "rsbar",
    about = "rsbar: i3bar/swaybar status command",
    author,
    version
)]
pub struct AppConfig {
    /// Path to rsbar.yaml; NONE skips the lookup and uses built-in defaults
    #[arg(long, short = 'c', env = "RSBAR_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the config file's colorVariant
    #[arg(long, value_enum)]
    pub theme: Option<ThemeVariant>,

    /// Write JSON trace logs to a file instead of plain logs to stderr
    #[arg(long = "logs", env = "RSBAR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging (overrides --logs)
    #[arg(long = "no-logs", env = "RSBAR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Trace log location used with --logs
    #[arg(long = "log-file", env = "RSBAR_TRACE_LOG", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Most verbose level that is logged (error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: tracing::Level,

    /// Print the resolved module configuration as YAML and exit
    #[arg(long = "print-config", default_value_t = false)]
    pub print_config: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check option combinations that clap cannot express.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(path) = &self.config {
            if path.as_os_str().is_empty() {
                bail!("--config must not be empty (use {NO_CONFIG} to skip the config file)");
            }
            if path.is_dir() {
                bail!(
                    "--config points at a directory ({}); expected a {CONFIG_FILE_NAME} file",
                    path.display()
                );
            }
        }
        if let Some(path) = &self.log_file {
            if path.is_dir() {
                bail!("--log-file points at a directory ({})", path.display());
            }
        }
        Ok(())
    }

    pub fn logging_enabled(&self) -> bool {
        !self.no_logs
    }

    pub fn file_logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }

    /// Color variant after applying the `--theme` override.
    pub fn resolve_variant(&self, bar: &BarConfig) -> ThemeVariant {
        self.theme.unwrap_or_else(|| bar.variant())
    }
}
