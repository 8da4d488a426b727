//! Interface discovery and classification
//!
//! Names come from the link lister (`ip -o link show`); everything after
//! that is lexical. Classification never looks at live interface state.

use crate::error::{NetcfgError, NetcfgResult};
use crate::validation;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::process::Command;
use tracing::debug;

/// Validated interface name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(name: &str) -> NetcfgResult<Self> {
        validation::validate_interface_name(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn classify(&self) -> InterfaceClass {
        classify(&self.0)
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InterfaceName {
    type Err = NetcfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plain interface or VLAN sub-interface (`base.tag`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceClass {
    Plain,
    Vlan { base: String, tag: String },
}

/// Split a name into base link and VLAN tag
///
/// VLAN only when the part after the first dot is all decimal digits and
/// both halves are non-empty. `a.b.c` and `foo.bar` stay plain.
pub fn classify(name: &str) -> InterfaceClass {
    match name.split_once('.') {
        Some((base, tag))
            if !base.is_empty() && !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_digit()) =>
        {
            InterfaceClass::Vlan {
                base: base.to_string(),
                tag: tag.to_string(),
            }
        }
        _ => InterfaceClass::Plain,
    }
}

/// What kind of link a name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Physical,
    Vlan,
    Bond,
    Bridge,
    Loopback,
    Tunnel,
    Vpn,
    Container,
    Virtual,
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceKind::Physical => "physical",
            InterfaceKind::Vlan => "vlan",
            InterfaceKind::Bond => "bond",
            InterfaceKind::Bridge => "bridge",
            InterfaceKind::Loopback => "loopback",
            InterfaceKind::Tunnel => "tunnel",
            InterfaceKind::Vpn => "vpn",
            InterfaceKind::Container => "container",
            InterfaceKind::Virtual => "virtual",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Include,
    #[default]
    Exclude,
}

/// Classification rule as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub kind: InterfaceKind,
    #[serde(default)]
    pub action: RuleAction,
}

/// Built-in rules, evaluated top to bottom, first match wins
///
/// Anything unmatched is a physical interface and is offered.
pub const DEFAULT_RULES: &[(&str, InterfaceKind, RuleAction)] = &[
    (r"^lo$", InterfaceKind::Loopback, RuleAction::Exclude),
    (r"^(bond|team)", InterfaceKind::Bond, RuleAction::Include),
    (r"^(docker|br-|virbr|lxcbr|lxdbr|cni|podman|vmbr)", InterfaceKind::Bridge, RuleAction::Exclude),
    (r"^(veth|cali|flannel|vxlan|kube-|weave|cilium)", InterfaceKind::Container, RuleAction::Exclude),
    (r"^(tun|tap|gre|gretap|erspan|ip6tnl|ip6gre|sit|ipip|ip_vti|ip6_vti)", InterfaceKind::Tunnel, RuleAction::Exclude),
    (r"^(wg|tailscale|zt|ppp|nordlynx|proton)", InterfaceKind::Vpn, RuleAction::Exclude),
    (r"^(dummy|ifb|nlmon)", InterfaceKind::Virtual, RuleAction::Exclude),
];

#[derive(Debug, Clone)]
struct ClassificationRule {
    pattern: Regex,
    kind: InterfaceKind,
    action: RuleAction,
}

/// Ordered inclusion/exclusion policy
#[derive(Debug, Clone)]
pub struct InterfacePolicy {
    rules: Vec<ClassificationRule>,
}

impl InterfacePolicy {
    /// Policy made of the built-in rules only
    pub fn builtin() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(pattern, kind, action)| ClassificationRule {
                pattern: Regex::new(pattern).expect("Invalid built-in interface rule"),
                kind: *kind,
                action: *action,
            })
            .collect();
        Self { rules }
    }

    /// User rules first, then the built-in ones
    pub fn with_rules(user_rules: &[RuleSpec]) -> NetcfgResult<Self> {
        let mut rules = Vec::with_capacity(user_rules.len() + DEFAULT_RULES.len());
        for spec in user_rules {
            let pattern = Regex::new(&spec.pattern).map_err(|e| {
                NetcfgError::Config(format!("Invalid interface rule '{}': {}", spec.pattern, e))
            })?;
            rules.push(ClassificationRule {
                pattern,
                kind: spec.kind,
                action: spec.action,
            });
        }
        rules.extend(Self::builtin().rules);
        Ok(Self { rules })
    }

    /// Kind of `name` and whether the policy offers it
    ///
    /// A VLAN inherits the inclusion decision of its base link.
    pub fn evaluate(&self, name: &str) -> (InterfaceKind, RuleAction) {
        if let InterfaceClass::Vlan { base, .. } = classify(name) {
            let (_, action) = self.match_rules(&base);
            return (InterfaceKind::Vlan, action);
        }
        self.match_rules(name)
    }

    fn match_rules(&self, name: &str) -> (InterfaceKind, RuleAction) {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(name))
            .map(|rule| (rule.kind, rule.action))
            .unwrap_or((InterfaceKind::Physical, RuleAction::Include))
    }
}

impl Default for InterfacePolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// One row of the interface listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceEntry {
    pub name: InterfaceName,
    pub kind: InterfaceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<String>,
}

/// Source of live interface names
#[async_trait]
pub trait LinkLister: Send + Sync {
    async fn list_links(&self) -> NetcfgResult<Vec<String>>;
}

/// Link lister backed by `ip -o link show`
pub struct IpLinkLister {
    binary: String,
}

impl IpLinkLister {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for IpLinkLister {
    fn default() -> Self {
        Self::new("ip")
    }
}

#[async_trait]
impl LinkLister for IpLinkLister {
    async fn list_links(&self) -> NetcfgResult<Vec<String>> {
        let args = ["-o", "link", "show"];
        let cmd_str = format!("{} {}", self.binary, args.join(" "));
        debug!("Listing links with '{}'", cmd_str);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| NetcfgError::CommandFailed {
                cmd: cmd_str.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(NetcfgError::CommandFailed {
                cmd: cmd_str,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_link_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract interface names from link-lister output
///
/// Accepts both `ip -o link show` lines (`2: ens3: <...>`) and bare names,
/// one per line. Peer suffixes (`veth0@if5`, `ens3.120@ens3`) are stripped
/// and duplicates dropped, keeping first-seen order.
pub fn parse_link_listing(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let field = match line.split_once(':') {
            Some((index, rest)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
                rest.trim_start().split(':').next().unwrap_or("")
            }
            _ => line.split_whitespace().next().unwrap_or(""),
        };

        let name = field.split('@').next().unwrap_or("").trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Applies an [`InterfacePolicy`] to whatever a [`LinkLister`] reports
pub struct InterfaceClassifier<L> {
    lister: L,
    policy: InterfacePolicy,
}

impl<L: LinkLister> InterfaceClassifier<L> {
    pub fn new(lister: L, policy: InterfacePolicy) -> Self {
        Self { lister, policy }
    }

    pub fn policy(&self) -> &InterfacePolicy {
        &self.policy
    }

    /// Names the user may pick from, in link order
    pub async fn list_candidate_interfaces(&self, include_all: bool) -> NetcfgResult<Vec<InterfaceName>> {
        Ok(self
            .list_entries(include_all)
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Candidate names together with their kind
    pub async fn list_entries(&self, include_all: bool) -> NetcfgResult<Vec<InterfaceEntry>> {
        let links = self.lister.list_links().await?;
        debug!("Link lister reported {} interfaces", links.len());
        Ok(classify_links(&self.policy, &links, include_all))
    }
}

/// Pure half of candidate listing
pub fn classify_links(policy: &InterfacePolicy, links: &[String], include_all: bool) -> Vec<InterfaceEntry> {
    let mut entries = Vec::new();

    for link in links {
        let name = match InterfaceName::new(link) {
            Ok(name) => name,
            Err(e) => {
                debug!("Skipping link '{}': {}", link, e);
                continue;
            }
        };

        let (kind, action) = policy.evaluate(name.as_str());
        if !include_all && action == RuleAction::Exclude {
            debug!("Excluding {} ({})", name, kind);
            continue;
        }

        let (vlan_link, vlan_id) = match name.classify() {
            InterfaceClass::Vlan { base, tag } => (Some(base), Some(tag)),
            InterfaceClass::Plain => (None, None),
        };

        entries.push(InterfaceEntry {
            name,
            kind,
            vlan_link,
            vlan_id,
        });
    }

    entries
}
