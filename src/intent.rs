//! Configuration intent
//!
//! [`ConfigIntent`] is the validated answer to "what should this interface
//! look like". It is built in one step from an [`IntentRequest`] (raw CLI
//! flags or prompt answers) and is never modified afterwards. Construction
//! performs no I/O: interface candidates and default DNS servers are passed
//! in by the caller.

use crate::address::{self, CidrAddress, Gateway};
use crate::error::{NetcfgError, NetcfgResult};
use crate::interface::{InterfaceClass, InterfaceName};
use crate::validation;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Ordered, duplicate-free list of DNS servers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsList(Vec<Ipv4Addr>);

impl DnsList {
    pub fn new(servers: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        let mut list = Vec::new();
        for server in servers {
            if list.contains(&server) {
                warn!("Ignoring duplicate DNS server {}", server);
                continue;
            }
            list.push(server);
        }
        Self(list)
    }

    /// Parse a comma-separated list
    ///
    /// Whitespace around entries and empty segments are ignored; every
    /// remaining entry must be a valid IPv4 address.
    pub fn parse(text: &str) -> NetcfgResult<Self> {
        let servers = text
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(address::parse_address)
            .collect::<NetcfgResult<Vec<_>>>()?;
        Ok(Self::new(servers))
    }

    /// Parse several entries, each of which may itself be comma-separated
    pub fn parse_all<S: AsRef<str>>(entries: &[S]) -> NetcfgResult<Self> {
        let mut servers = Vec::new();
        for entry in entries {
            servers.extend(Self::parse(entry.as_ref())?.0);
        }
        Ok(Self::new(servers))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Ipv4Addr] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ipv4Addr> {
        self.0.iter()
    }
}

/// Static or DHCP addressing; exactly one per intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigMode {
    Static {
        address: CidrAddress,
        gateway: Gateway,
        dns: DnsList,
    },
    Dhcp {
        dns_override: DnsList,
    },
}

impl ConfigMode {
    pub fn is_dhcp(&self) -> bool {
        matches!(self, ConfigMode::Dhcp { .. })
    }
}

/// Raw, unvalidated input
#[derive(Debug, Clone, Default)]
pub struct IntentRequest {
    pub use_static: bool,
    pub use_dhcp: bool,
    pub interface: Option<String>,
    pub address: Option<String>,
    pub gateway: Option<String>,
    pub dns: Vec<String>,
    pub target_file: PathBuf,
}

/// Validated configuration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIntent {
    interface: InterfaceName,
    mode: ConfigMode,
    target_file: PathBuf,
}

impl ConfigIntent {
    /// Validate a request
    ///
    /// Phases run in order and stop at the first error: mode resolution,
    /// interface resolution, then field validation for the chosen mode.
    /// `candidates` is only consulted when no interface was named;
    /// `default_dns` fills in static mode when no servers were given.
    pub fn from_request(
        request: &IntentRequest,
        candidates: &[InterfaceName],
        default_dns: &DnsList,
    ) -> NetcfgResult<Self> {
        let use_dhcp = resolve_mode(request)?;
        let interface = resolve_interface(request.interface.as_deref(), candidates)?;

        let mode = if use_dhcp {
            ConfigMode::Dhcp {
                dns_override: DnsList::parse_all(&request.dns)?,
            }
        } else {
            static_mode(request, default_dns)?
        };

        Ok(Self {
            interface,
            mode,
            target_file: request.target_file.clone(),
        })
    }

    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    pub fn mode(&self) -> &ConfigMode {
        &self.mode
    }

    pub fn target_file(&self) -> &Path {
        &self.target_file
    }
}

/// Mode resolution, the first phase of intent construction
///
/// Returns true for DHCP, false for static. Pure, so callers run it before
/// any I/O to report a conflict ahead of every other error.
pub fn resolve_mode(request: &IntentRequest) -> NetcfgResult<bool> {
    match (request.use_static, request.use_dhcp) {
        (true, true) => Err(NetcfgError::ModeConflict(
            "static and DHCP are mutually exclusive".to_string(),
        )),
        (false, false) => Err(NetcfgError::ModeConflict(
            "one of static or DHCP must be selected".to_string(),
        )),
        (false, true) if request.address.is_some() || request.gateway.is_some() => {
            Err(NetcfgError::ModeConflict(
                "address and gateway cannot be set in DHCP mode".to_string(),
            ))
        }
        (_, use_dhcp) => Ok(use_dhcp),
    }
}

/// Pick the interface to configure
pub fn resolve_interface(
    requested: Option<&str>,
    candidates: &[InterfaceName],
) -> NetcfgResult<InterfaceName> {
    let interface = match requested {
        Some(name) => InterfaceName::new(name)?,
        None => match candidates {
            [] => return Err(NetcfgError::NoInterface),
            [only] => only.clone(),
            many => {
                return Err(NetcfgError::AmbiguousInterface(
                    many.iter().map(|n| n.to_string()).collect(),
                ))
            }
        },
    };

    if let InterfaceClass::Vlan { tag, .. } = interface.classify() {
        validation::validate_vlan_id(&tag)?;
    }

    Ok(interface)
}

fn static_mode(request: &IntentRequest, default_dns: &DnsList) -> NetcfgResult<ConfigMode> {
    let (address, gateway) = match (request.address.as_deref(), request.gateway.as_deref()) {
        (Some(address), Some(gateway)) => (address, gateway),
        _ => {
            return Err(NetcfgError::ModeConflict(
                "static mode requires both an address and a gateway".to_string(),
            ))
        }
    };

    let address = address::parse_cidr(address)?;
    let gateway = Gateway::new(&address, address::parse_address(gateway)?)?;

    let mut dns = DnsList::parse_all(&request.dns)?;
    if dns.is_empty() {
        dns = default_dns.clone();
    }
    if dns.is_empty() {
        return Err(NetcfgError::Format(
            "static mode requires at least one DNS server".to_string(),
        ));
    }

    Ok(ConfigMode::Static {
        address,
        gateway,
        dns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_request() -> IntentRequest {
        IntentRequest {
            use_static: true,
            interface: Some("ens3".to_string()),
            address: Some("192.168.100.10/24".to_string()),
            gateway: Some("192.168.100.1".to_string()),
            dns: vec!["1.1.1.1,8.8.8.8".to_string()],
            target_file: PathBuf::from("/etc/netplan/01-netcfg.yaml"),
            ..Default::default()
        }
    }

    fn dhcp_request() -> IntentRequest {
        IntentRequest {
            use_dhcp: true,
            interface: Some("ens3".to_string()),
            target_file: PathBuf::from("/etc/netplan/01-netcfg.yaml"),
            ..Default::default()
        }
    }

    fn names(list: &[&str]) -> Vec<InterfaceName> {
        list.iter().map(|n| InterfaceName::new(n).unwrap()).collect()
    }

    #[test]
    fn test_dns_list_parse() {
        let dns = DnsList::parse(" 1.1.1.1 , 8.8.8.8,,").unwrap();
        assert_eq!(dns.as_slice(), &[Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(8, 8, 8, 8)]);

        let dns = DnsList::parse("9.9.9.9,1.1.1.1,9.9.9.9").unwrap();
        assert_eq!(dns.as_slice(), &[Ipv4Addr::new(9, 9, 9, 9), Ipv4Addr::new(1, 1, 1, 1)]);

        assert!(DnsList::parse("").unwrap().is_empty());
        assert!(matches!(DnsList::parse("1.1.1.1,8.8.8"), Err(NetcfgError::Format(_))));
    }

    #[test]
    fn test_static_intent() {
        let intent = ConfigIntent::from_request(&static_request(), &[], &DnsList::default()).unwrap();
        assert_eq!(intent.interface().as_str(), "ens3");
        assert_eq!(intent.target_file(), Path::new("/etc/netplan/01-netcfg.yaml"));
        match intent.mode() {
            ConfigMode::Static { address, gateway, dns } => {
                assert_eq!(address.to_string(), "192.168.100.10/24");
                assert_eq!(gateway.to_string(), "192.168.100.1");
                assert_eq!(dns.len(), 2);
            }
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_static_uses_default_dns() {
        let mut request = static_request();
        request.dns.clear();
        let defaults = DnsList::parse("9.9.9.9").unwrap();
        let intent = ConfigIntent::from_request(&request, &[], &defaults).unwrap();
        match intent.mode() {
            ConfigMode::Static { dns, .. } => assert_eq!(dns, &defaults),
            other => panic!("unexpected mode {:?}", other),
        }

        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::Format(_))
        ));
    }

    #[test]
    fn test_dhcp_intent() {
        let intent = ConfigIntent::from_request(&dhcp_request(), &[], &DnsList::default()).unwrap();
        assert_eq!(
            intent.mode(),
            &ConfigMode::Dhcp {
                dns_override: DnsList::default()
            }
        );

        let mut request = dhcp_request();
        request.dns = vec!["1.1.1.1".to_string()];
        let intent = ConfigIntent::from_request(&request, &[], &DnsList::parse("8.8.8.8").unwrap()).unwrap();
        match intent.mode() {
            ConfigMode::Dhcp { dns_override } => {
                assert_eq!(dns_override.as_slice(), &[Ipv4Addr::new(1, 1, 1, 1)])
            }
            other => panic!("unexpected mode {:?}", other),
        }

        request.dns = vec!["1.1.1.300".to_string()];
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::Format(_))
        ));
    }

    #[test]
    fn test_mode_conflicts() {
        let mut both = static_request();
        both.use_dhcp = true;
        assert!(matches!(
            ConfigIntent::from_request(&both, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));

        let mut neither = static_request();
        neither.use_static = false;
        assert!(matches!(
            ConfigIntent::from_request(&neither, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));

        let mut dhcp_with_address = dhcp_request();
        dhcp_with_address.gateway = Some("10.0.0.1".to_string());
        assert!(matches!(
            ConfigIntent::from_request(&dhcp_with_address, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));

        let mut static_missing_gateway = static_request();
        static_missing_gateway.gateway = None;
        assert!(matches!(
            ConfigIntent::from_request(&static_missing_gateway, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));
    }

    #[test]
    fn test_mode_conflict_wins_over_invalid_fields() {
        let request = IntentRequest {
            use_static: true,
            use_dhcp: true,
            interface: Some("bad name!".to_string()),
            address: Some("not-a-cidr".to_string()),
            gateway: Some("999.1.1.1".to_string()),
            dns: vec!["nope".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));

        let request = IntentRequest {
            use_dhcp: true,
            address: Some("192.168.1.0/24".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::ModeConflict(_))
        ));
    }

    #[test]
    fn test_resolve_mode() {
        assert!(!resolve_mode(&static_request()).unwrap());
        assert!(resolve_mode(&dhcp_request()).unwrap());

        // Nothing but the flags is looked at
        let both = IntentRequest {
            use_static: true,
            use_dhcp: true,
            target_file: PathBuf::from("/tmp/x.conf"),
            ..Default::default()
        };
        assert!(matches!(resolve_mode(&both), Err(NetcfgError::ModeConflict(_))));
        assert!(matches!(resolve_mode(&IntentRequest::default()), Err(NetcfgError::ModeConflict(_))));
    }

    #[test]
    fn test_interface_resolution() {
        let mut request = static_request();
        request.interface = None;

        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::NoInterface)
        ));

        let intent = ConfigIntent::from_request(&request, &names(&["enp1s0"]), &DnsList::default()).unwrap();
        assert_eq!(intent.interface().as_str(), "enp1s0");

        match ConfigIntent::from_request(&request, &names(&["enp1s0", "enp2s0"]), &DnsList::default()) {
            Err(NetcfgError::AmbiguousInterface(found)) => assert_eq!(found, vec!["enp1s0", "enp2s0"]),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_vlan_interface_resolution() {
        assert!(resolve_interface(Some("ens3.120"), &[]).is_ok());
        assert!(matches!(resolve_interface(Some("ens3.0"), &[]), Err(NetcfgError::Range(_))));
        assert!(matches!(resolve_interface(Some("ens3.5000"), &[]), Err(NetcfgError::Range(_))));
        // Non-numeric suffix is a plain name, not a VLAN
        assert!(resolve_interface(Some("foo.bar"), &[]).is_ok());
        assert!(matches!(resolve_interface(Some("eth 0"), &[]), Err(NetcfgError::Format(_))));
    }

    #[test]
    fn test_field_errors_are_specific() {
        let mut request = static_request();
        request.address = Some("192.168.100.0/24".to_string());
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::Range(_))
        ));

        let mut request = static_request();
        request.gateway = Some("10.0.0.1".to_string());
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::SubnetMismatch { .. })
        ));

        let mut request = static_request();
        request.gateway = Some("192.168.100.255".to_string());
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::DegenerateAddress { .. })
        ));

        let mut request = static_request();
        request.dns = vec!["1.1.1.1".to_string(), "8.8.8.x".to_string()];
        assert!(matches!(
            ConfigIntent::from_request(&request, &[], &DnsList::default()),
            Err(NetcfgError::Format(_))
        ));
    }
}
