//! Merging of source sets and diffing against what the peer already has.

use crate::address::{Address, AddressSet};

/// Union of every source's entries, deduplicated and numerically ordered.
///
/// Source identity is lost here on purpose: the target set only says what
/// should be advertised, not why.
pub fn reconcile<'a, I>(sources: I) -> AddressSet
where
    I: IntoIterator<Item = &'a AddressSet>,
{
    sources
        .into_iter()
        .flat_map(|set| set.iter().copied())
        .collect()
}

/// What has to change on the peer to turn `advertised` into `target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// `target - advertised`, ascending.
    pub advertise: Vec<Address>,
    /// `advertised - target`, ascending.
    pub withdraw: Vec<Address>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.advertise.is_empty() && self.withdraw.is_empty()
    }

    /// Apply the delta to a set, as the peer would after receiving every command.
    pub fn apply(&self, advertised: &mut AddressSet) {
        for addr in &self.advertise {
            advertised.insert(*addr);
        }
        for addr in &self.withdraw {
            advertised.remove(addr);
        }
    }
}

pub fn diff(target: &AddressSet, advertised: &AddressSet) -> Delta {
    Delta {
        advertise: target.difference(advertised).copied().collect(),
        withdraw: advertised.difference(target).copied().collect(),
    }
}

/// Number of individual IPv4 addresses covered by a set (overlaps counted twice).
pub fn count_addresses(set: &AddressSet) -> u64 {
    set.iter()
        .map(|addr| 1u64 << (32 - u32::from(addr.prefix_len())))
        .fold(0u64, |acc, count| acc.saturating_add(count))
}
