//! IPv4 prefix parsing, classification and list normalization.
//!
//! Every entry that reaches a route command goes through [`parse_address`],
//! so the canonical `ip/prefix` text is produced in exactly one place.

use ipnet::Ipv4Net;
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::debug;

use crate::error::{ControllerError, Result};

/// A single blacklisted IPv4 prefix in canonical `ip/prefix` form.
///
/// Ordering is numeric: by the integer value of the address, then by prefix
/// length. Host bits are kept as written (`10.0.0.1/24` is not truncated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Ipv4Net);

impl Address {
    pub fn ip(&self) -> Ipv4Addr {
        self.0.addr()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// RFC1918 space plus loopback, judged on the address alone.
    pub fn is_private(&self) -> bool {
        is_private(self.ip())
    }

    /// RFC1700 reserved space (`0/8` and `224/4` upwards), judged on the address alone.
    pub fn is_reserved(&self) -> bool {
        is_reserved(self.ip())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip(), self.prefix_len())
    }
}

impl FromStr for Address {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

/// Ordered, deduplicated set of addresses.
pub type AddressSet = BTreeSet<Address>;

/// Parse `ip` or `ip/prefix` into an [`Address`].
///
/// A bare address becomes a `/32`. Octets must be decimal 0-255 and the
/// prefix length must be 1-32; anything else is rejected.
///
/// # Examples
/// ```
/// use voipbl_rtbh::address::parse_address;
/// assert_eq!(parse_address("192.0.2.7").unwrap().to_string(), "192.0.2.7/32");
/// assert_eq!(parse_address("10.0.0.0/24").unwrap().to_string(), "10.0.0.0/24");
/// assert!(parse_address("10.0.0.0/0").is_err());
/// assert!(parse_address("300.1.1.1").is_err());
/// ```
pub fn parse_address(input: &str) -> Result<Address> {
    let (ip_part, prefix_part) = match input.split_once('/') {
        Some((ip, prefix)) => (ip, Some(prefix)),
        None => (input, None),
    };

    let ip: Ipv4Addr = ip_part
        .parse()
        .map_err(|_| ControllerError::InvalidAddress(input.to_string()))?;

    let prefix = match prefix_part {
        None => 32,
        Some(p) => {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ControllerError::InvalidAddress(input.to_string()));
            }
            let len: u8 = p
                .parse()
                .map_err(|_| ControllerError::InvalidAddress(input.to_string()))?;
            if !(1..=32).contains(&len) {
                return Err(ControllerError::InvalidAddress(input.to_string()));
            }
            len
        }
    };

    Ipv4Net::new(ip, prefix)
        .map(Address)
        .map_err(|_| ControllerError::InvalidAddress(input.to_string()))
}

/// 10/8, 172.16/12, 192.168/16 and 127/8.
pub fn is_private(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 10 || a == 127 || (a == 172 && (16..=31).contains(&b)) || (a == 192 && b == 168)
}

/// 0/8 and everything from 224.0.0.0 up (multicast and class E).
pub fn is_reserved(ip: Ipv4Addr) -> bool {
    let [a, _, _, _] = ip.octets();
    a == 0 || a >= 224
}

pub fn is_not_private(ip: Ipv4Addr) -> bool {
    !is_private(ip)
}

pub fn is_not_reserved(ip: Ipv4Addr) -> bool {
    !is_reserved(ip)
}

/// Per-source filtering policy. Reserved space is always dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    pub exclude_private: bool,
}

/// Turn the raw text of a blacklist into a normalized [`AddressSet`].
///
/// Lines are stripped of trailing whitespace, then passed through the filter
/// pipeline in order: unparsable, reserved, and (per policy) private entries
/// are dropped.
pub fn normalize_list(content: &str, policy: FilterPolicy) -> AddressSet {
    let mut set = AddressSet::new();
    let mut unparsable = 0usize;
    let mut reserved = 0usize;
    let mut private = 0usize;

    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let addr = match parse_address(line) {
            Ok(addr) => addr,
            Err(_) => {
                unparsable += 1;
                continue;
            }
        };
        if addr.is_reserved() {
            reserved += 1;
            continue;
        }
        if policy.exclude_private && addr.is_private() {
            private += 1;
            continue;
        }
        set.insert(addr);
    }

    debug!(
        "Normalized list: {} kept, {} unparsable, {} reserved, {} private dropped",
        set.len(),
        unparsable,
        reserved,
        private
    );

    set
}
