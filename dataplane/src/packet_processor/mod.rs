// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

mod egress;
mod forward;

pub use egress::Egress;
pub use forward::AdaptiveForwarder;

use concurrency::sync::Arc;
use counters::PortCounters;
use net::ids::NodeId;
use pipeline::{DynPipeline, PacketDumper, PipelineError};
use routing::{TablesReader, TablesWriter};
use tracing::info;

use crate::node::ForwardingNode;

/// Id of the forwarding stage in a node pipeline
pub const STAGE_FORWARD: &str = "forward";
/// Id of the egress stage in a node pipeline
pub const STAGE_EGRESS: &str = "egress";
/// Id of the packet dumper, last in a node pipeline
pub const STAGE_DUMP: &str = "post-egress";

/// Builds a pipeline for a forwarding worker. Every pipeline gets its own table readers.
pub type PipelineBuilder = Arc<dyn Send + Sync + Fn() -> DynPipeline>;

/// The state of a node: the writer of its tables, its counters and a way to build
/// the pipelines of its workers.
pub struct NodeSetup {
    pub name: NodeId,
    pub tables: TablesWriter,
    pub counters: Arc<PortCounters>,
    pub pipeline: PipelineBuilder,
}

impl NodeSetup {
    /// A forwarding worker for this node
    #[must_use]
    pub fn worker(&self) -> ForwardingNode {
        ForwardingNode::new(&self.name, (self.pipeline)())
    }
}

fn build_pipeline(
    tables: &TablesReader,
    counters: &Arc<PortCounters>,
) -> Result<DynPipeline, PipelineError> {
    let mut pipeline = DynPipeline::new();
    pipeline
        .add_stage_with_id(
            STAGE_FORWARD,
            AdaptiveForwarder::new("Adaptive-Forward", tables.clone(), counters.clone()),
        )?
        .add_stage_with_id(STAGE_EGRESS, Egress::new("Egress", tables.clone()))?
        .add_stage_with_id(
            STAGE_DUMP,
            PacketDumper::new("post-egress", true, Some(PacketDumper::drops_only())),
        )?;
    Ok(pipeline)
}

/// Create the tables of a node and provide the associated pipeline builder
#[must_use]
pub fn start_node(name: &NodeId, counters: Arc<PortCounters>) -> NodeSetup {
    let (tables, reader) = TablesWriter::new();
    let factory = reader.factory();
    let stage_counters = counters.clone();

    let pipeline_builder = move || {
        let reader = TablesReader::new(factory.handle());
        build_pipeline(&reader, &stage_counters)
            .unwrap_or_else(|e| unreachable!("Bad node pipeline: {e}"))
    };

    info!("Started node {name} with {} port counters", counters.width());
    NodeSetup {
        name: name.clone(),
        tables,
        counters,
        pipeline: Arc::new(pipeline_builder),
    }
}
