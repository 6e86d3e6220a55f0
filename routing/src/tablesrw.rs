// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarding tables left-right

use left_right::{Absorb, ReadGuard, ReadHandle, ReadHandleFactory, WriteHandle};
use lpm::prefix::Ipv4Prefix;
use net::eth::mac::Mac;
use net::ids::PortId;

use crate::tables::{EcmpGroupId, EcmpGroupInfo, ForwardingTables, NextHop, RouteAction};

/// A change to the [`ForwardingTables`] of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    AddRoute(Ipv4Prefix, RouteAction),
    DelRoute(Ipv4Prefix),
    AddGroup(EcmpGroupId, EcmpGroupInfo),
    AddMember(EcmpGroupId, u16, NextHop),
    AddAlternate(PortId, NextHop),
    AddSourceMac(PortId, Mac),
    Clear,
}

impl Absorb<TableChange> for ForwardingTables {
    fn absorb_first(&mut self, change: &mut TableChange, _: &Self) {
        self.bump_version();
        match change {
            TableChange::AddRoute(prefix, action) => {
                self.add_route(*prefix, *action);
            }
            TableChange::DelRoute(prefix) => {
                self.del_route(prefix);
            }
            TableChange::AddGroup(group, info) => self.add_group(*group, *info),
            TableChange::AddMember(group, index, nhop) => self.add_member(*group, *index, *nhop),
            TableChange::AddAlternate(port, nhop) => {
                self.add_alternate(*port, *nhop);
            }
            TableChange::AddSourceMac(port, mac) => self.add_source_mac(*port, *mac),
            TableChange::Clear => self.clear(),
        }
    }
    fn drop_first(self: Box<Self>) {}
    fn sync_with(&mut self, first: &Self) {
        *self = first.clone();
    }
}

/// The single writer of the tables of a node
pub struct TablesWriter(WriteHandle<ForwardingTables, TableChange>);
impl TablesWriter {
    #[must_use]
    pub fn new() -> (TablesWriter, TablesReader) {
        let (w, r) = left_right::new_from_empty::<ForwardingTables, TableChange>(
            ForwardingTables::new(),
        );
        (TablesWriter(w), TablesReader(r))
    }
    #[must_use]
    pub fn as_tables_reader(&self) -> TablesReader {
        TablesReader::new(self.0.clone())
    }
    /// Access the published tables
    pub fn enter(&self) -> Option<ReadGuard<'_, ForwardingTables>> {
        self.0.enter()
    }
    /// Queue a change, making it visible to readers if `publish` is set
    pub fn apply(&mut self, change: TableChange, publish: bool) {
        self.0.append(change);
        if publish {
            self.0.publish();
        }
    }
    pub fn add_route(&mut self, prefix: Ipv4Prefix, action: RouteAction, publish: bool) {
        self.apply(TableChange::AddRoute(prefix, action), publish);
    }
    pub fn add_group(&mut self, group: EcmpGroupId, info: EcmpGroupInfo, publish: bool) {
        self.apply(TableChange::AddGroup(group, info), publish);
    }
    pub fn add_member(&mut self, group: EcmpGroupId, index: u16, nhop: NextHop, publish: bool) {
        self.apply(TableChange::AddMember(group, index, nhop), publish);
    }
    pub fn add_alternate(&mut self, port: PortId, nhop: NextHop, publish: bool) {
        self.apply(TableChange::AddAlternate(port, nhop), publish);
    }
    pub fn add_source_mac(&mut self, port: PortId, mac: Mac, publish: bool) {
        self.apply(TableChange::AddSourceMac(port, mac), publish);
    }
    pub fn clear(&mut self, publish: bool) {
        self.apply(TableChange::Clear, publish);
    }
    pub fn publish(&mut self) {
        self.0.publish();
    }
}

/// A handle to read the tables of a node. Each forwarding worker owns one.
#[derive(Clone, Debug)]
pub struct TablesReader(ReadHandle<ForwardingTables>);
impl TablesReader {
    #[must_use]
    pub fn new(rhandle: ReadHandle<ForwardingTables>) -> Self {
        TablesReader(rhandle)
    }
    /// Access the tables. `None` once the writer is gone.
    pub fn enter(&self) -> Option<ReadGuard<'_, ForwardingTables>> {
        self.0.enter()
    }
    #[must_use]
    pub fn factory(&self) -> ReadHandleFactory<ForwardingTables> {
        self.0.factory()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn nhop(port: u16) -> NextHop {
        NextHop::new(PortId::new(port), Mac([0, 0, 0, 0, 0, 1]))
    }

    #[test]
    fn changes_visible_only_once_published() {
        let (mut writer, reader) = TablesWriter::new();
        let prefix: Ipv4Prefix = "10.0.2.0/24".parse().unwrap();

        writer.add_route(prefix, RouteAction::Forward(nhop(1)), false);
        assert!(reader.enter().unwrap().is_empty());

        writer.publish();
        let tables = reader.enter().unwrap();
        assert_eq!(tables.get_route(&prefix), Some(&RouteAction::Forward(nhop(1))));
        assert_eq!(tables.version(), 1);
    }

    #[test]
    fn both_copies_converge() {
        let (mut writer, reader) = TablesWriter::new();
        let gid = EcmpGroupId::new(1);
        writer.add_group(gid, EcmpGroupInfo::new(2, 0), false);
        writer.add_member(gid, 0, nhop(2), false);
        writer.add_member(gid, 1, nhop(3), true);
        // second publish makes the writer apply the operations to the other copy
        writer.add_alternate(PortId::new(2), nhop(3), true);
        writer.add_source_mac(PortId::new(2), Mac([0, 0, 1, 0, 0, 2]), true);

        let tables = reader.enter().unwrap();
        assert_eq!(tables.len_members(), 2);
        assert_eq!(tables.member(gid, 1), Some(&nhop(3)));
        assert_eq!(tables.alternate(PortId::new(2)), Some(&nhop(3)));
        assert_eq!(tables.version(), 5);
        drop(tables);

        writer.clear(true);
        assert!(reader.enter().unwrap().is_empty());
        assert!(writer.as_tables_reader().enter().unwrap().is_empty());
    }

    #[test]
    fn reader_sees_nothing_after_writer_dropped() {
        let (writer, reader) = TablesWriter::new();
        assert!(reader.enter().is_some());
        drop(writer);
        assert!(reader.enter().is_none());
    }

    #[test]
    fn concurrent_readers_see_whole_groups() {
        let (mut writer, reader) = TablesWriter::new();
        let prefix: Ipv4Prefix = "10.0.2.0/24".parse().unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let factory = reader.factory();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let reader = TablesReader::new(factory.handle());
                let done = done.clone();
                thread::spawn(move || {
                    let mut checks = 0u64;
                    while !done.load(Ordering::Relaxed) {
                        let Some(tables) = reader.enter() else {
                            break;
                        };
                        if let Some((_, RouteAction::Ecmp(gid))) =
                            tables.lookup_route("10.0.2.1".parse().unwrap())
                        {
                            let info = tables.group(*gid).unwrap();
                            for i in info.base..info.base + info.count {
                                assert!(tables.member(*gid, i).is_some());
                            }
                            checks += 1;
                        }
                    }
                    checks
                })
            })
            .collect();

        for round in 0..200u16 {
            let gid = EcmpGroupId::new(round % 3 + 1);
            let count = round % 4 + 1;
            writer.clear(false);
            writer.add_group(gid, EcmpGroupInfo::new(count, 0), false);
            for i in 0..count {
                writer.add_member(gid, i, nhop(i + 1), false);
            }
            writer.add_route(prefix, RouteAction::Ecmp(gid), true);
        }
        done.store(true, Ordering::Relaxed);
        for worker in workers {
            worker.join().unwrap();
        }
    }
}
