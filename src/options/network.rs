//! Address, port and interface validation.
use std::net::Ipv4Addr;
use std::str::FromStr;

use cidr_utils::cidr::Ipv4Inet;
use eui48::MacAddress;

use crate::error::OptionError;

const LOWEST_PORT_NUMBER: i64 = 0;
const TOP_PORT_NUMBER: i64 = 65535;

/// Accepts an IPv4 address or IPv4 CIDR block.
///
/// Addresses are returned in canonical dotted form, blocks as their network
/// (`192.168.1.1/24` becomes `192.168.1.0/24`).
pub fn normalize_target(target: &str) -> Result<String, OptionError> {
    if let Ok(address) = Ipv4Addr::from_str(target) {
        return Ok(address.to_string());
    }

    if target.contains('/') {
        if let Ok(inet) = Ipv4Inet::from_str(target) {
            let network = inet.network();
            return Ok(format!(
                "{}/{}",
                network.first_address(),
                network.network_length()
            ));
        }
    }

    Err(OptionError::InvalidTarget(target.to_owned()))
}

/// A single port in `0..=65535`.
pub fn parse_port(flag: &'static str, value: &str) -> Result<u16, OptionError> {
    let number: i64 = value.parse().map_err(|_| OptionError::NotNumeric {
        flag,
        value: value.to_owned(),
    })?;

    u16::try_from(number).map_err(|_| OptionError::OutOfRange {
        flag,
        value: value.to_owned(),
        min: LOWEST_PORT_NUMBER,
        max: TOP_PORT_NUMBER,
    })
}

/// A single port (`50000`) or an ascending range of two distinct ports
/// (`50000-50010`).
pub fn parse_port_spec(flag: &'static str, value: &str) -> Result<String, OptionError> {
    if !value.contains('-') {
        return parse_port(flag, value).map(|port| port.to_string());
    }

    let (lower, upper) = split_range(flag, value)?;
    let lower = parse_port(flag, lower)?;
    let upper = parse_port(flag, upper)?;
    check_ascending(flag, value, lower, upper)?;

    Ok(format!("{lower}-{upper}"))
}

/// A single IPv4 address or an ascending range of two distinct addresses
/// (`10.0.0.1-10.0.0.5`).
pub fn parse_source_ip(flag: &'static str, value: &str) -> Result<String, OptionError> {
    let ipv4 = |text: &str| {
        Ipv4Addr::from_str(text).map_err(|_| OptionError::InvalidIpv4 {
            flag,
            value: text.to_owned(),
        })
    };

    if !value.contains('-') {
        return ipv4(value).map(|address| address.to_string());
    }

    let (lower, upper) = split_range(flag, value)?;
    let lower = ipv4(lower)?;
    let upper = ipv4(upper)?;
    check_ascending(flag, value, lower, upper)?;

    Ok(format!("{lower}-{upper}"))
}

fn split_range<'a>(flag: &'static str, value: &'a str) -> Result<(&'a str, &'a str), OptionError> {
    let parts: Vec<&str> = value.split('-').collect();
    match parts.as_slice() {
        [lower, upper] => Ok((*lower, *upper)),
        _ => Err(OptionError::InvalidRange {
            flag,
            value: value.to_owned(),
            reason: "expected exactly one '-' between lower and upper bound",
        }),
    }
}

fn check_ascending<T: Ord>(
    flag: &'static str,
    value: &str,
    lower: T,
    upper: T,
) -> Result<(), OptionError> {
    let reason = match lower.cmp(&upper) {
        std::cmp::Ordering::Less => return Ok(()),
        std::cmp::Ordering::Equal => "lower and upper bound cannot be equal",
        std::cmp::Ordering::Greater => "lower bound cannot be greater than upper bound",
    };
    Err(OptionError::InvalidRange {
        flag,
        value: value.to_owned(),
        reason,
    })
}

pub fn check_mac(flag: &'static str, value: &str) -> Result<(), OptionError> {
    MacAddress::parse_str(value)
        .map(|_| ())
        .map_err(|_| OptionError::InvalidMac {
            flag,
            value: value.to_owned(),
        })
}

/// Whether the host has a network interface called `name`.
#[cfg(unix)]
pub fn interface_exists(name: &str) -> Result<bool, OptionError> {
    let interfaces = nix::ifaddrs::getifaddrs()
        .map_err(|e| OptionError::InterfacesUnavailable(e.to_string()))?;
    Ok(interfaces
        .into_iter()
        .any(|interface| interface.interface_name == name))
}

#[cfg(not(unix))]
pub fn interface_exists(_name: &str) -> Result<bool, OptionError> {
    Err(OptionError::InterfacesUnavailable(
        "interface enumeration is only supported on unix".to_owned(),
    ))
}
