// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow hashing used to pick a member of an ECMP group

use crate::tables::EcmpGroupInfo;
use ahash::RandomState;
use net::flow::FlowKey;
use std::hash::{BuildHasher, Hasher};

// Fixed keys: every node and the control plane must place a flow on the same member.
const FLOW_HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Hash the fixed encoding of a [`FlowKey`]. The value only depends on the key.
#[must_use]
pub fn flow_hash(key: &FlowKey) -> u64 {
    let [k0, k1, k2, k3] = FLOW_HASH_SEEDS;
    let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    hasher.write(&key.to_bytes());
    hasher.finish()
}

/// Hash slot in `[base, base + count)` for a flow. `None` if the group is empty.
#[must_use]
pub fn ecmp_index(key: &FlowKey, group: &EcmpGroupInfo) -> Option<u16> {
    if group.count == 0 {
        return None;
    }
    let slot = flow_hash(key) % u64::from(group.count);
    u16::try_from(slot)
        .ok()
        .and_then(|slot| group.base.checked_add(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    fn flows(number: u16) -> Vec<FlowKey> {
        (1..=number)
            .map(|n| {
                let [hi, lo] = n.to_be_bytes();
                FlowKey::new(
                    Ipv4Addr::new(10, 0, hi, lo),
                    Ipv4Addr::new(10, 1, lo, hi),
                    17,
                    1024 + n,
                    u16::MAX - n,
                )
            })
            .collect()
    }

    #[test]
    fn same_flow_same_slot() {
        let group = EcmpGroupInfo::new(3, 0);
        for flow in flows(200) {
            let first = ecmp_index(&flow, &group);
            assert!(first.is_some());
            for _ in 0..10 {
                assert_eq!(ecmp_index(&flow, &group), first);
            }
        }
    }

    #[test]
    fn slots_within_bounds_and_all_used() {
        let group = EcmpGroupInfo::new(4, 10);
        let mut hits: BTreeMap<u16, usize> = BTreeMap::new();
        for flow in flows(2000) {
            let Some(index) = ecmp_index(&flow, &group) else {
                panic!("No slot for {flow}");
            };
            assert!(group.contains(index), "{index} out of range");
            *hits.entry(index).or_default() += 1;
        }
        assert_eq!(hits.keys().copied().collect::<Vec<_>>(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn single_member_group() {
        let group = EcmpGroupInfo::new(1, 0);
        assert!(flows(50).iter().all(|f| ecmp_index(f, &group) == Some(0)));
    }

    #[test]
    fn empty_group_has_no_slot() {
        let flow = flows(1)[0];
        assert_eq!(ecmp_index(&flow, &EcmpGroupInfo::new(0, 0)), None);
    }

    #[test]
    fn ports_take_part_in_the_hash() {
        let src = Ipv4Addr::new(10, 0, 1, 1);
        let dst = Ipv4Addr::new(10, 0, 2, 1);
        let hashes: std::collections::BTreeSet<u64> = (0..64)
            .map(|sport| flow_hash(&FlowKey::new(src, dst, 6, 40000 + sport, 80)))
            .collect();
        assert!(hashes.len() > 1);
    }

    #[test]
    fn hash_is_a_pure_function_of_the_key() {
        bolero::check!()
            .with_type::<(u32, u32, u8, u16, u16)>()
            .for_each(|(src, dst, proto, sport, dport)| {
                let key =
                    FlowKey::new(Ipv4Addr::from(*src), Ipv4Addr::from(*dst), *proto, *sport, *dport);
                let copy = FlowKey::new(key.src, key.dst, key.proto, key.src_port, key.dst_port);
                assert_eq!(flow_hash(&key), flow_hash(&copy));
                let group = EcmpGroupInfo::new(u16::from(*proto % 8) + 1, 0);
                let index = ecmp_index(&key, &group);
                assert!(index.is_some_and(|i| group.contains(i)));
            });
    }
}
