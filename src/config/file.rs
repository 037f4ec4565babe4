use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::xdg::{resolve_config_path, ConfigSource};
use super::ConfigError;
use crate::theme::ThemeVariant;

pub const DEFAULT_NETWORK_PATTERN: &str = "(en|wl)+";
pub const DEFAULT_TEXT_CONTENT: &str = "rsbar";

/// Root of `rsbar.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarConfig {
    #[serde(default = "default_color_variant")]
    pub color_variant: String,
    /// Raw entries; each is decoded on its own so one bad entry does not
    /// take the whole bar down.
    #[serde(default = "default_module_values")]
    pub modules: Vec<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Seconds between capacity reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatetimeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// strftime-style format string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// `Local` or IANA zone names, one block each
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timezones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Exact interface name; mutually exclusive with `pattern`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Regex matched against interface names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

/// One decoded `modules:` entry, tagged by its `module:` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum ModuleConfig {
    Battery(BatteryConfig),
    Datetime(DatetimeConfig),
    Memory(MemoryConfig),
    Network(NetworkConfig),
    Text(TextConfig),
}

impl ModuleConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Battery(_) => "battery",
            Self::Datetime(_) => "datetime",
            Self::Memory(_) => "memory",
            Self::Network(_) => "network",
            Self::Text(_) => "text",
        }
    }

    /// Name the module's slot and blocks go by: the explicit `name`, else the
    /// module kind.
    pub fn slot_name(&self) -> &str {
        let explicit = match self {
            Self::Battery(cfg) => cfg.name.as_deref(),
            Self::Datetime(cfg) => cfg.name.as_deref(),
            Self::Memory(cfg) => cfg.name.as_deref(),
            Self::Network(cfg) => cfg.name.as_deref(),
            Self::Text(cfg) => cfg.name.as_deref(),
        };
        explicit.unwrap_or_else(|| self.kind())
    }
}

fn default_color_variant() -> String {
    ThemeVariant::Dark.as_str().to_string()
}

pub fn default_modules() -> Vec<ModuleConfig> {
    vec![
        ModuleConfig::Network(NetworkConfig {
            pattern: Some(DEFAULT_NETWORK_PATTERN.to_string()),
            ..NetworkConfig::default()
        }),
        ModuleConfig::Datetime(DatetimeConfig {
            timezones: vec!["Local".to_string()],
            interval: Some(1),
            ..DatetimeConfig::default()
        }),
        ModuleConfig::Text(TextConfig {
            name: None,
            content: DEFAULT_TEXT_CONTENT.to_string(),
        }),
    ]
}

fn default_module_values() -> Vec<serde_yaml::Value> {
    default_modules()
        .iter()
        .filter_map(|module| serde_yaml::to_value(module).ok())
        .collect()
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            color_variant: default_color_variant(),
            modules: default_module_values(),
        }
    }
}

impl BarConfig {
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        // An empty file is valid YAML `null`; treat it as "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Color variant, falling back to dark for names we do not know.
    pub fn variant(&self) -> ThemeVariant {
        ThemeVariant::from_name(&self.color_variant).unwrap_or_else(|| {
            tracing::warn!(variant = %self.color_variant, "unknown colorVariant; using dark");
            ThemeVariant::Dark
        })
    }

    /// Decode every entry, skipping (and logging) the ones that do not
    /// describe a known module.
    pub fn decode_modules(&self) -> Vec<ModuleConfig> {
        let mut decoded = Vec::with_capacity(self.modules.len());
        for (idx, raw) in self.modules.iter().enumerate() {
            match serde_yaml::from_value::<ModuleConfig>(raw.clone()) {
                Ok(module) => decoded.push(module),
                Err(err) => {
                    tracing::warn!(entry = idx, "skipping module entry: {err}");
                }
            }
        }
        decoded
    }

    /// Decoded modules, rejecting configurations where two slots would share
    /// a name (clicks and updates are routed by name).
    pub fn modules_checked(&self) -> Result<Vec<ModuleConfig>, ConfigError> {
        let modules = self.decode_modules();
        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.slot_name().to_string()) {
                return Err(ConfigError::DuplicateName(module.slot_name().to_string()));
            }
        }
        Ok(modules)
    }
}

/// Where the bar configuration came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedFrom {
    File(PathBuf),
    Defaults,
}

/// Resolve the config location for the `--config` flag and load it.
///
/// A missing file falls back to defaults; an unreadable or malformed one is
/// an error.
pub fn load_bar_config(flag: Option<&Path>) -> Result<(BarConfig, LoadedFrom), ConfigError> {
    let path = match resolve_config_path(flag)? {
        ConfigSource::Disabled | ConfigSource::NotFound => {
            return Ok((BarConfig::default(), LoadedFrom::Defaults));
        }
        ConfigSource::File(path) => path,
    };
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = BarConfig::parse(&text, &path)?;
    Ok((config, LoadedFrom::File(path)))
}
