// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::prefix::{Ipv4Addr, Ipv4Prefix};

mod prefix_map_impl;
pub use prefix_map_impl::*;

pub trait TrieMap: Clone {
    type Value;

    /// This function gets the prefix, with exact match, it does not do LPM
    fn get(&self, prefix: &Ipv4Prefix) -> Option<&Self::Value>;
    /// This function gets the prefix, with exact match, it does not do LPM
    fn get_mut(&mut self, prefix: &Ipv4Prefix) -> Option<&mut Self::Value>;

    fn iter(&self) -> impl Iterator<Item = (&Ipv4Prefix, &Self::Value)>;
    fn is_empty(&self) -> bool;
    fn insert(&mut self, prefix: Ipv4Prefix, value: Self::Value) -> Option<Self::Value>;
    fn len(&self) -> usize;
    fn clear(&mut self);

    /// This function gets the prefix, with longest prefix match
    fn lookup(&self, addr: Ipv4Addr) -> Option<(&Ipv4Prefix, &Self::Value)>;

    fn remove(&mut self, prefix: &Ipv4Prefix) -> Option<Self::Value>;
}
