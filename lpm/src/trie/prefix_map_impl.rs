// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::prefix::{Ipv4Addr, Ipv4Prefix};
use crate::trie::TrieMap;
use prefix_trie::PrefixMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ipv4PrefixW(Ipv4Prefix);
impl prefix_trie::Prefix for Ipv4PrefixW {
    type R = u32;

    fn repr(&self) -> u32 {
        self.0.network().to_bits()
    }

    fn prefix_len(&self) -> u8 {
        self.0.len()
    }

    fn from_repr_len(repr: u32, len: u8) -> Self {
        let len = len.min(Ipv4Prefix::MAX_LEN);
        // cannot fail once the length is clamped
        Ipv4PrefixW(Ipv4Prefix::new(Ipv4Addr::from_bits(repr), len).unwrap_or_default())
    }
}

/// Longest-prefix-match table over IPv4 prefixes
#[derive(Clone)]
pub struct PrefixMapTrie<V: Clone>(PrefixMap<Ipv4PrefixW, V>);

impl<V: Clone> Default for PrefixMapTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> PrefixMapTrie<V> {
    #[must_use]
    pub fn new() -> Self {
        Self(PrefixMap::new())
    }

    #[must_use]
    pub fn with_root(value: V) -> Self {
        let mut ret = Self::new();
        ret.insert(Ipv4Prefix::ROOT, value);
        ret
    }
}

impl<V: Clone + std::fmt::Debug> std::fmt::Debug for PrefixMapTrie<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: Clone> TrieMap for PrefixMapTrie<V> {
    type Value = V;

    fn iter(&self) -> impl Iterator<Item = (&Ipv4Prefix, &V)> {
        self.0.iter().map(|(p, v)| (&p.0, v))
    }

    fn get(&self, prefix: &Ipv4Prefix) -> Option<&V> {
        self.0.get(&Ipv4PrefixW(*prefix))
    }

    fn get_mut(&mut self, prefix: &Ipv4Prefix) -> Option<&mut V> {
        self.0.get_mut(&Ipv4PrefixW(*prefix))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn clear(&mut self) {
        self.0 = PrefixMap::new();
    }

    fn insert(&mut self, prefix: Ipv4Prefix, value: V) -> Option<V> {
        self.0.insert(Ipv4PrefixW(prefix), value)
    }

    fn remove(&mut self, prefix: &Ipv4Prefix) -> Option<V> {
        self.0.remove(&Ipv4PrefixW(*prefix))
    }

    fn lookup(&self, addr: Ipv4Addr) -> Option<(&Ipv4Prefix, &V)> {
        self.0
            .get_lpm(&Ipv4PrefixW(Ipv4Prefix::host(addr)))
            .map(|x| (&x.0.0, x.1))
    }
}
