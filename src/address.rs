//! IPv4 address and subnet arithmetic
//!
//! Pure helpers: parsing dotted-decimal and CIDR text, prefix masks,
//! network/broadcast derivation and gateway placement checks.

use crate::error::{NetcfgError, NetcfgResult};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Parse a dotted-decimal IPv4 address
///
/// Exactly four decimal groups in 0..=255, no surrounding whitespace,
/// no leading zeros.
pub fn parse_address(text: &str) -> NetcfgResult<Ipv4Addr> {
    text.parse::<Ipv4Addr>()
        .map_err(|_| NetcfgError::Format(format!("Invalid IPv4 address: '{}'", text)))
}

/// Netmask for a prefix length
///
/// Prefix 32 is the all-ones mask; 0 (never accepted by `Prefix`) maps to 0.
pub fn mask_of(prefix: u8) -> u32 {
    if prefix >= 32 {
        return u32::MAX;
    }
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

/// Subnet prefix length, 1..=32
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix(u8);

impl Prefix {
    pub fn new(len: u8) -> NetcfgResult<Self> {
        if !(1..=32).contains(&len) {
            return Err(NetcfgError::Format(format!(
                "Prefix length {} must be between 1 and 32",
                len
            )));
        }
        Ok(Self(len))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn mask(self) -> u32 {
        mask_of(self.0)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host address inside a subnet
///
/// Never the subnet's network or broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrAddress {
    address: Ipv4Addr,
    prefix: Prefix,
}

impl CidrAddress {
    pub fn new(address: Ipv4Addr, prefix: Prefix) -> NetcfgResult<Self> {
        let cidr = Self { address, prefix };
        if address == cidr.network() {
            return Err(NetcfgError::Range(format!(
                "{} is the network address of {}/{}",
                address,
                cidr.network(),
                prefix
            )));
        }
        if address == cidr.broadcast() {
            return Err(NetcfgError::Range(format!(
                "{} is the broadcast address of {}/{}",
                address,
                cidr.network(),
                prefix
            )));
        }
        Ok(cidr)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.prefix.mask())
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network()) | !self.prefix.mask())
    }

    /// Whether `other` falls in the same masked network
    pub fn contains(&self, other: Ipv4Addr) -> bool {
        u32::from(other) & self.prefix.mask() == u32::from(self.network())
    }
}

impl fmt::Display for CidrAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for CidrAddress {
    type Err = NetcfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cidr(s)
    }
}

impl Serialize for CidrAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse `a.b.c.d/len` into a host address
pub fn parse_cidr(text: &str) -> NetcfgResult<CidrAddress> {
    let (addr, len) = text.split_once('/').ok_or_else(|| {
        NetcfgError::Format(format!("Missing '/prefix' in CIDR address '{}'", text))
    })?;

    let address = parse_address(addr)?;

    if len.is_empty() || len.len() > 2 || !len.chars().all(|c| c.is_ascii_digit()) {
        return Err(NetcfgError::Format(format!(
            "Invalid prefix length '{}' in '{}'",
            len, text
        )));
    }
    let len: u8 = len
        .parse()
        .map_err(|_| NetcfgError::Format(format!("Invalid prefix length in '{}'", text)))?;

    CidrAddress::new(address, Prefix::new(len)?)
}

/// Default gateway bound to the host address it serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gateway(Ipv4Addr);

impl Gateway {
    pub fn new(host: &CidrAddress, gateway: Ipv4Addr) -> NetcfgResult<Self> {
        validate_gateway_same_subnet(host, gateway)?;
        Ok(Self(gateway))
    }

    pub fn address(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `gateway` is a usable neighbour of `host`
///
/// Subnet membership is checked before the degenerate-address cases.
pub fn validate_gateway_same_subnet(host: &CidrAddress, gateway: Ipv4Addr) -> NetcfgResult<()> {
    if !host.contains(gateway) {
        return Err(NetcfgError::SubnetMismatch {
            gateway,
            network: host.network(),
            prefix: host.prefix().bits(),
        });
    }

    let role = if gateway == host.network() {
        Some("network")
    } else if gateway == host.broadcast() {
        Some("broadcast")
    } else if gateway == host.address() {
        Some("host")
    } else {
        None
    };

    match role {
        Some(role) => Err(NetcfgError::DegenerateAddress { gateway, role }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> CidrAddress {
        parse_cidr(s).unwrap()
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("192.168.1.1").unwrap(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(parse_address("0.0.0.0").unwrap(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(parse_address("255.255.255.255").unwrap(), Ipv4Addr::BROADCAST);

        for bad in [
            "256.1.1.1",
            "1.2.3",
            "1.2.3.4.5",
            "1.2.3.4 ",
            " 1.2.3.4",
            "1.2.3.4/24",
            "a.b.c.d",
            "1..2.3",
            "010.0.0.1",
            "",
        ] {
            assert!(
                matches!(parse_address(bad), Err(NetcfgError::Format(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_address_canonical_text() {
        for text in ["10.0.0.1", "192.168.100.10", "1.1.1.1", "172.16.254.3", "0.0.0.0"] {
            assert_eq!(parse_address(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_mask_of() {
        assert_eq!(mask_of(32), 0xffff_ffff);
        assert_eq!(mask_of(31), 0xffff_fffe);
        assert_eq!(mask_of(24), 0xffff_ff00);
        assert_eq!(mask_of(16), 0xffff_0000);
        assert_eq!(mask_of(1), 0x8000_0000);
        assert_eq!(mask_of(0), 0);
    }

    #[test]
    fn test_prefix_bounds() {
        assert!(Prefix::new(0).is_err());
        assert!(Prefix::new(1).is_ok());
        assert!(Prefix::new(32).is_ok());
        assert!(Prefix::new(33).is_err());
    }

    #[test]
    fn test_parse_cidr() {
        let c = cidr("192.168.100.10/24");
        assert_eq!(c.address(), Ipv4Addr::new(192, 168, 100, 10));
        assert_eq!(c.prefix().bits(), 24);
        assert_eq!(c.network(), Ipv4Addr::new(192, 168, 100, 0));
        assert_eq!(c.broadcast(), Ipv4Addr::new(192, 168, 100, 255));
        assert_eq!(c.to_string(), "192.168.100.10/24");

        let c = cidr("10.1.2.3/8");
        assert_eq!(c.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(c.broadcast(), Ipv4Addr::new(10, 255, 255, 255));
    }

    #[test]
    fn test_parse_cidr_format_errors() {
        for bad in [
            "192.168.1.10",
            "192.168.1.10/",
            "192.168.1.10/0",
            "192.168.1.10/33",
            "192.168.1.10/+4",
            "192.168.1.10/024",
            "192.168.1.10/24/1",
            "192.168.1/24",
        ] {
            assert!(
                matches!(parse_cidr(bad), Err(NetcfgError::Format(_))),
                "{} should be a format error",
                bad
            );
        }
    }

    #[test]
    fn test_parse_cidr_degenerate() {
        assert!(matches!(parse_cidr("192.168.1.0/24"), Err(NetcfgError::Range(_))));
        assert!(matches!(parse_cidr("192.168.1.255/24"), Err(NetcfgError::Range(_))));
        assert!(parse_cidr("192.168.1.1/24").is_ok());
        assert!(parse_cidr("192.168.1.254/24").is_ok());
    }

    #[test]
    fn test_parse_cidr_rejects_exactly_network_and_broadcast() {
        // Walk every address of a /28 and a /30
        for prefix in [28u8, 30] {
            let mask = mask_of(prefix);
            let base = u32::from(Ipv4Addr::new(10, 20, 30, 64));
            let size = !mask + 1;
            for offset in 0..size {
                let addr = Ipv4Addr::from(base + offset);
                let text = format!("{}/{}", addr, prefix);
                let degenerate = offset == 0 || offset == size - 1;
                assert_eq!(parse_cidr(&text).is_err(), degenerate, "{}", text);
            }
        }
    }

    #[test]
    fn test_point_to_point_prefixes_rejected() {
        // /31 and /32 have no address distinct from network and broadcast
        assert!(matches!(parse_cidr("10.0.0.0/31"), Err(NetcfgError::Range(_))));
        assert!(matches!(parse_cidr("10.0.0.1/31"), Err(NetcfgError::Range(_))));
        assert!(matches!(parse_cidr("10.0.0.7/32"), Err(NetcfgError::Range(_))));
    }

    #[test]
    fn test_gateway_validation() {
        let host = cidr("192.168.100.10/24");
        assert!(validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 100, 1)).is_ok());
        assert!(validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 100, 254)).is_ok());

        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 101, 1)),
            Err(NetcfgError::SubnetMismatch { .. })
        ));
        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 100, 0)),
            Err(NetcfgError::DegenerateAddress { role: "network", .. })
        ));
        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 100, 255)),
            Err(NetcfgError::DegenerateAddress { role: "broadcast", .. })
        ));
        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(192, 168, 100, 10)),
            Err(NetcfgError::DegenerateAddress { role: "host", .. })
        ));
    }

    #[test]
    fn test_gateway_mismatch_checked_first() {
        // Broadcast of a different subnet is a mismatch, not a degenerate address
        let host = cidr("10.0.0.5/30");
        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(10, 0, 0, 7)),
            Err(NetcfgError::DegenerateAddress { role: "broadcast", .. })
        ));
        assert!(matches!(
            validate_gateway_same_subnet(&host, Ipv4Addr::new(10, 0, 0, 11)),
            Err(NetcfgError::SubnetMismatch { .. })
        ));
        assert!(Gateway::new(&host, Ipv4Addr::new(10, 0, 0, 6)).is_ok());
    }
}
