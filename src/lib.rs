//! netcfg - Netplan Configuration Library
//!
//! Generates a netplan document for a single IPv4 interface:
//! - Address and gateway validation (CIDR math)
//! - Interface discovery and classification (plain, VLAN, virtual)
//! - Document rendering (static or DHCP, VLAN sub-interfaces)
//! - Backup-then-write of the target file
//! - Validation and apply through the `netplan` command

pub mod error;
pub mod validation;
pub mod address;
pub mod interface;
pub mod intent;
pub mod document;
pub mod writer;
pub mod apply;
pub mod pipeline;
pub mod prompt;
pub mod config;

// Re-export commonly used types
pub use error::{NetcfgError, NetcfgResult};
pub use address::{CidrAddress, Gateway, Prefix};
pub use interface::{
    InterfaceClass, InterfaceClassifier, InterfaceKind, InterfaceName, InterfacePolicy,
    IpLinkLister, LinkLister,
};
pub use intent::{ConfigIntent, ConfigMode, DnsList, IntentRequest};
pub use document::{ConfigDocument, DocumentBuilder};
pub use writer::{SafeWriter, WriteOptions, WriteResult};
pub use apply::{ApplyRunner, ApplyStatus, NetplanBackend, NetplanCli, RunMode};
pub use pipeline::{Outcome, Pipeline};
pub use config::NetcfgConfig;
