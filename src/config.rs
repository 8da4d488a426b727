//! Configuration management for netcfg

use crate::error::{NetcfgError, NetcfgResult};
use crate::interface::{InterfacePolicy, RuleSpec};
use crate::intent::DnsList;
use crate::writer::WriteOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the tool's own configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netcfg/netcfg.toml";

/// Main netcfg configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetcfgConfig {
    #[serde(default)]
    pub paths: ConfigPaths,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default)]
    pub document: DocumentSettings,
    #[serde(default)]
    pub defaults: DefaultSettings,
    #[serde(default)]
    pub write: WriteSettings,
    #[serde(default)]
    pub interfaces: InterfaceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPaths {
    /// Directory holding netplan documents
    #[serde(default = "default_netplan_dir")]
    pub netplan_dir: PathBuf,
    /// File name used when the directory holds no documents
    #[serde(default = "default_file")]
    pub default_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commands {
    #[serde(default = "default_netplan_bin")]
    pub netplan: String,
    #[serde(default = "default_ip_bin")]
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSettings {
    /// `network.renderer`; empty string omits the key
    #[serde(default = "default_renderer")]
    pub renderer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// DNS servers for static mode when none are given
    #[serde(default = "default_dns")]
    pub dns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteSettings {
    #[serde(default)]
    pub atomic: bool,
    #[serde(default = "default_mode")]
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSettings {
    /// Evaluated before the built-in rules
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_netplan_dir() -> PathBuf {
    PathBuf::from("/etc/netplan")
}

fn default_file() -> String {
    "01-netcfg.yaml".to_string()
}

fn default_netplan_bin() -> String {
    "netplan".to_string()
}

fn default_ip_bin() -> String {
    "ip".to_string()
}

fn default_renderer() -> String {
    "networkd".to_string()
}

fn default_dns() -> Vec<String> {
    vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()]
}

fn default_mode() -> u32 {
    0o600
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            netplan_dir: default_netplan_dir(),
            default_file: default_file(),
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            netplan: default_netplan_bin(),
            ip: default_ip_bin(),
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            renderer: default_renderer(),
        }
    }
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self { dns: default_dns() }
    }
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self {
            atomic: false,
            mode: default_mode(),
        }
    }
}

impl NetcfgConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> NetcfgResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NetcfgError::Config(format!("Failed to read config {}: {}", path.as_ref().display(), e)))?;

        Self::from_toml(&content)
    }

    /// Load the explicitly named file, or the default one if it exists
    ///
    /// A missing default file means built-in defaults; a missing explicit
    /// file is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> NetcfgResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => {
                debug!("No config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> NetcfgResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NetcfgError::Config(format!("Failed to parse config: {}", e)))?;
        config.default_dns()?;
        config.interface_policy()?;
        Ok(config)
    }

    /// Configured default DNS servers, validated
    pub fn default_dns(&self) -> NetcfgResult<DnsList> {
        DnsList::parse_all(&self.defaults.dns)
            .map_err(|e| NetcfgError::Config(format!("Invalid defaults.dns: {}", e)))
    }

    pub fn interface_policy(&self) -> NetcfgResult<InterfacePolicy> {
        InterfacePolicy::with_rules(&self.interfaces.rules)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            atomic: self.write.atomic,
            mode: Some(self.write.mode),
        }
    }

    pub fn renderer(&self) -> Option<String> {
        Some(self.document.renderer.clone()).filter(|r| !r.is_empty())
    }
}
