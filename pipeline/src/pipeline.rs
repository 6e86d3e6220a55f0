// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(clippy::missing_errors_doc)]

use crate::NetworkFunction;
use crate::dyn_nf::{DynNetworkFunction, DynNetworkFunctionImpl, nf_dyn};
use dyn_iter::IntoDynIterator;
use net::packet::Packet;
use ordermap::OrderMap;
use std::any::Any;

/// Name of a stage in a [`DynPipeline`]
pub type StageId = String;

/// Named stages, run in insertion order.
#[derive(Default)]
pub struct DynPipeline {
    nfs: OrderMap<StageId, Box<dyn DynNetworkFunction>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Duplicate stage id: {0}")]
    DuplicateStageId(String),
}

impl DynPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage under `id`, which must not name another stage already.
    pub fn add_stage_with_id<NF: NetworkFunction + Send + 'static>(
        &mut self,
        id: &str,
        nf: NF,
    ) -> Result<&mut Self, PipelineError> {
        if self.nfs.contains_key(id) {
            return Err(PipelineError::DuplicateStageId(id.to_owned()));
        }
        self.nfs.insert(id.to_owned(), nf_dyn(nf));
        Ok(self)
    }

    /// The stage registered under `id`, if it is a `T`
    #[must_use]
    pub fn get_stage_by_id<T: NetworkFunction + Send + 'static>(&self, id: &str) -> Option<&T> {
        self.nfs
            .get(id)
            .and_then(|nf| (&**nf as &dyn Any).downcast_ref::<DynNetworkFunctionImpl<T>>())
            .map(DynNetworkFunctionImpl::get_nf)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nfs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nfs.is_empty()
    }
}

impl NetworkFunction for DynPipeline {
    fn process<'a, Input: Iterator<Item = Packet> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet> + 'a {
        self.nfs
            .values_mut()
            .fold(input.into_dyn_iter(), move |input, nf| nf.process_dyn(input))
    }
}
