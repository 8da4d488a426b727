//! Error types for netcfg

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetcfgError {
    /// Malformed address, CIDR, interface name or DNS entry
    #[error("Invalid format: {0}")]
    Format(String),
    /// Prefix, VLAN id or degenerate host address out of range
    #[error("Out of range: {0}")]
    Range(String),
    /// Gateway is not in the host's subnet
    #[error("Gateway {gateway} is not in subnet {network}/{prefix}")]
    SubnetMismatch {
        gateway: Ipv4Addr,
        network: Ipv4Addr,
        prefix: u8,
    },
    /// Gateway equals the network, broadcast or host address
    #[error("Gateway {gateway} cannot be the {role} address")]
    DegenerateAddress { gateway: Ipv4Addr, role: &'static str },
    /// Static and DHCP both or neither selected, or static fields under DHCP
    #[error("Mode conflict: {0}")]
    ModeConflict(String),
    /// No candidate interface to configure
    #[error("No configurable network interface found")]
    NoInterface,
    /// Several candidates and nobody to choose between them
    #[error("Multiple interfaces found ({}); use --interface to pick one", .0.join(", "))]
    AmbiguousInterface(Vec<String>),
    /// Pre-write copy of the existing document failed
    #[error("Failed to back up {path:?}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// `netplan generate` rejected the document
    #[error("Validation failed: {0}")]
    Validation(String),
    /// `netplan apply` failed
    #[error("Apply failed: {0}")]
    Apply(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Tool configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    /// External command could not be run or reported failure
    #[error("Command '{cmd}' failed{}: {stderr}", .code.map(|c| format!(" with code {}", c)).unwrap_or_default())]
    CommandFailed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Interactive terminal failure
    #[error("Prompt failed: {0}")]
    Prompt(String),
}

impl NetcfgError {
    /// Stable classification name, identical for interactive and CLI use
    pub fn kind(&self) -> &'static str {
        match self {
            NetcfgError::Format(_) => "format",
            NetcfgError::Range(_) => "range",
            NetcfgError::SubnetMismatch { .. } => "subnet-mismatch",
            NetcfgError::DegenerateAddress { .. } => "degenerate-address",
            NetcfgError::ModeConflict(_) => "mode-conflict",
            NetcfgError::NoInterface => "no-interface",
            NetcfgError::AmbiguousInterface(_) => "ambiguous-interface",
            NetcfgError::Backup { .. } => "backup",
            NetcfgError::Validation(_) => "validation",
            NetcfgError::Apply(_) => "apply",
            NetcfgError::Io(_) => "io",
            NetcfgError::Config(_) => "config",
            NetcfgError::CommandFailed { .. } => "command",
            NetcfgError::PermissionDenied(_) => "permission",
            NetcfgError::Prompt(_) => "prompt",
        }
    }
}

impl From<serde_yaml::Error> for NetcfgError {
    fn from(error: serde_yaml::Error) -> Self {
        NetcfgError::Format(format!("YAML serialization error: {}", error))
    }
}

pub type NetcfgResult<T> = Result<T, NetcfgError>;
