// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::NetworkFunction;
use dyn_iter::{DynIter, IntoDynIterator};
use net::packet::Packet;
use std::any::Any;

/// Object-safe form of [`NetworkFunction`], the type of the stages a
/// [`DynPipeline`][crate::DynPipeline] holds.
pub(crate) trait DynNetworkFunction: Any + Send {
    fn process_dyn<'a>(&'a mut self, input: DynIter<'a, Packet>) -> DynIter<'a, Packet>;
}

pub(crate) struct DynNetworkFunctionImpl<NF: NetworkFunction + 'static> {
    nf: NF,
}

impl<NF: NetworkFunction> DynNetworkFunctionImpl<NF> {
    pub fn get_nf(&self) -> &NF {
        &self.nf
    }
}

/// Box a stage
pub(crate) fn nf_dyn<NF: NetworkFunction + Send + 'static>(nf: NF) -> Box<dyn DynNetworkFunction> {
    Box::new(DynNetworkFunctionImpl { nf })
}

impl<NF: NetworkFunction + Send> DynNetworkFunction for DynNetworkFunctionImpl<NF> {
    fn process_dyn<'a>(&'a mut self, input: DynIter<'a, Packet>) -> DynIter<'a, Packet> {
        self.nf.process(input).into_dyn_iter()
    }
}
