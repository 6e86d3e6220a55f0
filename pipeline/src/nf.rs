// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use net::packet::Packet;

/// A stage of a node's forwarding path.
pub trait NetworkFunction {
    /// Consume a batch of packets and yield the packets that come out of the stage.
    ///
    /// A stage either filters out the packets it discards or yields them marked done,
    /// in which case later stages leave them alone.
    fn process<'a, Input: Iterator<Item = Packet> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet> + 'a;
}
