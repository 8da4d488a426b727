//! Input validation
//!
//! Checks shared by interface resolution, intent construction and the
//! writer. Interface names also end up in a root-owned file and in
//! arguments to external commands, so they are kept to a conservative
//! character set.

use crate::error::{NetcfgError, NetcfgResult};
use std::path::Path;

/// Maximum length for interface names (Linux kernel limit is 15)
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Highest usable 802.1Q VLAN id
const MAX_VLAN_ID: u16 = 4094;

/// Validate an interface name
///
/// ASCII alphanumerics plus `-`, `_` and `.` (VLAN sub-interfaces), at most
/// 15 characters, not starting with a dash.
pub fn validate_interface_name(name: &str) -> NetcfgResult<()> {
    if name.is_empty() {
        return Err(NetcfgError::Format(
            "Interface name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(NetcfgError::Format(
            format!("Interface name '{}' too long (max {} characters)", name, MAX_INTERFACE_NAME_LEN)
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(NetcfgError::Format(
                format!("Invalid interface name '{}': contains invalid character '{}'", name, c)
            ));
        }
    }

    // Could be interpreted as an option by the link lister
    if name.starts_with('-') {
        return Err(NetcfgError::Format(
            "Interface name cannot start with dash".to_string()
        ));
    }

    Ok(())
}

/// Validate a VLAN tag taken from an interface name
pub fn validate_vlan_id(tag: &str) -> NetcfgResult<u16> {
    let id: u16 = tag.parse()
        .map_err(|_| NetcfgError::Range(format!("VLAN id '{}' must be between 1 and {}", tag, MAX_VLAN_ID)))?;

    if id == 0 || id > MAX_VLAN_ID {
        return Err(NetcfgError::Range(
            format!("VLAN id {} must be between 1 and {}", id, MAX_VLAN_ID)
        ));
    }

    Ok(id)
}

/// Validate a target document path
///
/// Must carry a `.yaml`/`.yml` extension (the network manager ignores
/// anything else) and, if it already exists, be a regular file rather
/// than a directory or symlink.
pub fn validate_target_path(path: &Path) -> NetcfgResult<()> {
    let has_yaml_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);

    if !has_yaml_ext {
        return Err(NetcfgError::Format(
            format!("Target file {} must end in .yaml or .yml", path.display())
        ));
    }

    if let Ok(metadata) = std::fs::symlink_metadata(path) {
        if metadata.file_type().is_symlink() {
            return Err(NetcfgError::Format(
                format!("Target file {} cannot be a symlink", path.display())
            ));
        }
        if metadata.is_dir() {
            return Err(NetcfgError::Format(
                format!("Target file {} is a directory", path.display())
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interface_name_validation() {
        // Valid names
        assert!(validate_interface_name("eth0").is_ok());
        assert!(validate_interface_name("enp0s31f6").is_ok());
        assert!(validate_interface_name("bond0").is_ok());
        assert!(validate_interface_name("ens3.120").is_ok());
        assert!(validate_interface_name("br_lan-1").is_ok());

        // Invalid names - injection attempts
        assert!(validate_interface_name("eth0; rm -rf /").is_err());
        assert!(validate_interface_name("eth0`id`").is_err());
        assert!(validate_interface_name("eth0\nmalicious").is_err());
        assert!(validate_interface_name("eth0:1").is_err());

        // Invalid - too long
        assert!(validate_interface_name("verylonginterfacename").is_err());

        // Invalid - starts with dash
        assert!(validate_interface_name("-eth0").is_err());

        // Invalid - empty
        assert!(validate_interface_name("").is_err());
    }

    #[test]
    fn test_vlan_id_validation() {
        assert_eq!(validate_vlan_id("1").unwrap(), 1);
        assert_eq!(validate_vlan_id("120").unwrap(), 120);
        assert_eq!(validate_vlan_id("4094").unwrap(), 4094);

        assert!(matches!(validate_vlan_id("0"), Err(NetcfgError::Range(_))));
        assert!(matches!(validate_vlan_id("4095"), Err(NetcfgError::Range(_))));
        assert!(matches!(validate_vlan_id("99999"), Err(NetcfgError::Range(_))));
    }

    #[test]
    fn test_target_path_validation() {
        let dir = TempDir::new().unwrap();

        assert!(validate_target_path(&dir.path().join("01-netcfg.yaml")).is_ok());
        assert!(validate_target_path(&dir.path().join("50-cloud-init.yml")).is_ok());
        assert!(validate_target_path(&dir.path().join("netcfg.conf")).is_err());
        assert!(validate_target_path(&dir.path().join("noext")).is_err());

        let as_dir = dir.path().join("inner.yaml");
        std::fs::create_dir(&as_dir).unwrap();
        assert!(validate_target_path(&as_dir).is_err());

        let real = dir.path().join("real.yaml");
        std::fs::write(&real, "network: {}\n").unwrap();
        let link = dir.path().join("link.yaml");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(validate_target_path(&real).is_ok());
        assert!(validate_target_path(&link).is_err());
    }
}
