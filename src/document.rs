//! Netplan document model and builder
//!
//! The document is a typed tree serialized with `serde_yaml`; nothing is
//! assembled from text fragments. Maps are `BTreeMap`s so the same intent
//! always renders to the same bytes.

use crate::error::NetcfgResult;
use crate::intent::{ConfigIntent, ConfigMode, DnsList};
use crate::interface::{InterfaceClass, InterfaceKind, InterfacePolicy};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Schema version written under `network.version`
pub const NETPLAN_VERSION: u8 = 2;

/// Destination used for the default route
pub const DEFAULT_ROUTE: &str = "default";

/// Whole netplan file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub network: NetworkSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ethernets: BTreeMap<String, InterfaceEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vlans: BTreeMap<String, VlanEntry>,
}

/// Addressing shared by ethernet and VLAN entries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub dhcp4: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Nameservers>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanEntry {
    pub id: u16,
    pub link: String,
    #[serde(flatten)]
    pub entry: InterfaceEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub to: String,
    pub via: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nameservers {
    pub addresses: Vec<String>,
}

impl ConfigDocument {
    pub fn to_yaml(&self) -> NetcfgResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> NetcfgResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_yaml() {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Turns a [`ConfigIntent`] into a [`ConfigDocument`]
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    renderer: Option<String>,
    policy: InterfacePolicy,
}

impl DocumentBuilder {
    pub fn new(renderer: Option<String>) -> Self {
        Self {
            renderer: renderer.filter(|r| !r.is_empty()),
            policy: InterfacePolicy::default(),
        }
    }

    /// Classify VLAN base links with `policy` instead of the built-in rules
    pub fn with_policy(mut self, policy: InterfacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Kind of the link a VLAN is stacked on
    pub fn base_kind(&self, base: &str) -> InterfaceKind {
        self.policy.evaluate(base).0
    }

    /// Build the document for `intent`
    ///
    /// A VLAN gets a bare entry for its base link (so the link is brought
    /// up without addressing) plus the VLAN entry carrying the addressing.
    pub fn build(&self, intent: &ConfigIntent) -> NetcfgResult<ConfigDocument> {
        let mut network = NetworkSection {
            version: NETPLAN_VERSION,
            renderer: self.renderer.clone(),
            ethernets: BTreeMap::new(),
            vlans: BTreeMap::new(),
        };

        let entry = addressing(intent.mode());
        let name = intent.interface().to_string();

        match intent.interface().classify() {
            InterfaceClass::Plain => {
                network.ethernets.insert(name, entry);
            }
            InterfaceClass::Vlan { base, tag } => {
                let id = validation::validate_vlan_id(&tag)?;
                if self.base_kind(&base) == InterfaceKind::Bond {
                    warn!(
                        "{} is a bond; its stub goes under ethernets and netplan rejects it if another file declares it under bonds",
                        base
                    );
                }
                network.ethernets.insert(base.clone(), InterfaceEntry::default());
                network.vlans.insert(name, VlanEntry { id, link: base, entry });
            }
        }

        Ok(ConfigDocument { network })
    }
}

fn addressing(mode: &ConfigMode) -> InterfaceEntry {
    match mode {
        ConfigMode::Static { address, gateway, dns } => InterfaceEntry {
            dhcp4: false,
            addresses: vec![address.to_string()],
            routes: vec![RouteEntry {
                to: DEFAULT_ROUTE.to_string(),
                via: gateway.to_string(),
            }],
            nameservers: nameservers(dns),
        },
        ConfigMode::Dhcp { dns_override } => InterfaceEntry {
            dhcp4: true,
            nameservers: nameservers(dns_override),
            ..Default::default()
        },
    }
}

/// Empty lists are omitted rather than written as `addresses: []`
fn nameservers(dns: &DnsList) -> Option<Nameservers> {
    if dns.is_empty() {
        return None;
    }
    Some(Nameservers {
        addresses: dns.iter().map(|a| a.to_string()).collect(),
    })
}
