//! Interactive acquisition of missing values
//!
//! Prompts only fill in what the command line left out. Every answer is
//! checked with the same parsers the non-interactive path uses, and a bad
//! answer re-prompts instead of aborting. The completed request still goes
//! through [`ConfigIntent::from_request`](crate::intent::ConfigIntent::from_request).

use crate::address::{self, CidrAddress, Gateway};
use crate::error::{NetcfgError, NetcfgResult};
use crate::intent::{DnsList, IntentRequest};
use crate::interface::InterfaceName;
use dialoguer::{Confirm, Input, Select};
use std::fmt;

/// Map a dialoguer / terminal failure into NetcfgError
fn prompt_err(e: impl fmt::Display) -> NetcfgError {
    NetcfgError::Prompt(format!("prompt failed: {}", e))
}

pub fn check_interface(input: &str) -> Result<(), String> {
    crate::intent::resolve_interface(Some(input.trim()), &[])
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub fn check_cidr(input: &str) -> Result<(), String> {
    address::parse_cidr(input.trim()).map(|_| ()).map_err(|e| e.to_string())
}

pub fn check_gateway(host: &CidrAddress, input: &str) -> Result<(), String> {
    address::parse_address(input.trim())
        .and_then(|gw| Gateway::new(host, gw))
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub fn check_dns(input: &str) -> Result<(), String> {
    DnsList::parse(input).map(|_| ()).map_err(|e| e.to_string())
}

/// Fill the gaps in `request` from the terminal
///
/// `candidates` is offered when no interface was named; `default_dns` is
/// pre-filled for static mode.
pub fn complete_request(
    mut request: IntentRequest,
    candidates: &[InterfaceName],
    default_dns: &DnsList,
) -> NetcfgResult<IntentRequest> {
    if request.interface.is_none() {
        request.interface = Some(prompt_interface(candidates)?);
    }

    if !request.use_static && !request.use_dhcp {
        let modes = ["static", "dhcp"];
        let selection = Select::new()
            .with_prompt("Addressing mode")
            .items(&modes[..])
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        request.use_static = selection == 0;
        request.use_dhcp = selection == 1;
    }

    if request.use_static && !request.use_dhcp {
        let host = match request.address.as_deref() {
            Some(text) => address::parse_cidr(text)?,
            None => {
                let text: String = Input::new()
                    .with_prompt("Address (CIDR)")
                    .validate_with(|input: &String| check_cidr(input))
                    .interact_text()
                    .map_err(prompt_err)?;
                request.address = Some(text.trim().to_string());
                address::parse_cidr(text.trim())?
            }
        };

        if request.gateway.is_none() {
            let text: String = Input::new()
                .with_prompt("Gateway")
                .validate_with(|input: &String| check_gateway(&host, input))
                .interact_text()
                .map_err(prompt_err)?;
            request.gateway = Some(text.trim().to_string());
        }

        if request.dns.is_empty() {
            request.dns.push(prompt_dns("DNS servers (comma-separated)", default_dns, false)?);
        }
    } else if request.use_dhcp && !request.use_static && request.dns.is_empty() {
        let text = prompt_dns("DNS override (empty for DHCP-provided)", &DnsList::default(), true)?;
        if !text.trim().is_empty() {
            request.dns.push(text);
        }
    }

    Ok(request)
}

fn prompt_interface(candidates: &[InterfaceName]) -> NetcfgResult<String> {
    if candidates.is_empty() {
        let name: String = Input::new()
            .with_prompt("Interface")
            .validate_with(|input: &String| check_interface(input))
            .interact_text()
            .map_err(prompt_err)?;
        return Ok(name.trim().to_string());
    }

    let items: Vec<&str> = candidates.iter().map(InterfaceName::as_str).collect();
    let selection = Select::new()
        .with_prompt("Interface")
        .items(&items[..])
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(items[selection].to_string())
}

fn prompt_dns(prompt: &str, defaults: &DnsList, allow_empty: bool) -> NetcfgResult<String> {
    let mut input = Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(allow_empty)
        .validate_with(|input: &String| check_dns(input));
    if !defaults.is_empty() {
        input = input.default(join_dns(defaults));
    }
    input.interact_text().map_err(prompt_err)
}

fn join_dns(dns: &DnsList) -> String {
    dns.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(",")
}

/// Ask before writing, auto-approving if `--yes` was passed
pub fn confirm(message: &str, yes_flag: bool) -> NetcfgResult<bool> {
    if yes_flag {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}
