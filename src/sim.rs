use std::time::Duration;

use crate::err::*;
use crate::node::{Node, NodeBuilder, DEFAULT_SPIN_STEP};
use crate::protocol::*;
use crate::time::{Clock, SimClock};
use crate::transport::memory::MemoryBus;

/// Two nodes on one memory bus, running against one simulated clock.
///
/// Nothing happens unless the pair is spun, which makes the timing of every call exactly
/// reproducible.
pub struct InterlinkedNodes {
    pub a: Node,
    pub b: Node,
    clock: SimClock,
    bus: MemoryBus,
}

impl InterlinkedNodes {
    /// Node A has ID 1, node B has ID 2
    pub fn new() -> ServiceResult<Self> {
        Self::with_ids(NodeId::new(1), NodeId::new(2))
    }

    pub fn with_ids(a: NodeId, b: NodeId) -> ServiceResult<Self> {
        let clock = SimClock::new();
        let bus = MemoryBus::new();

        let a = NodeBuilder::new(a).clock(clock.clone()).build(bus.connect(a)?)?;
        let b = NodeBuilder::new(b).clock(clock.clone()).build(bus.connect(b)?)?;

        Ok(InterlinkedNodes { a, b, clock, bus })
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Make `S` known to both nodes
    pub fn register_data_type<S: ServiceType>(&self) -> ServiceResult<DataTypeId> {
        let id = self.a.register_data_type::<S>()?;
        self.b.register_data_type_with_id::<S>(id.0)?;
        Ok(id)
    }

    /// Spin both nodes in turn, letting simulated time pass in steps of `DEFAULT_SPIN_STEP`,
    /// until `duration` has elapsed.
    pub fn spin_both(&self, duration: Duration) -> ServiceResult<()> {
        let deadline = self.clock.now() + duration;
        loop {
            self.a.spin_once()?;
            self.b.spin_once()?;

            let now = self.clock.now();
            if now >= deadline {
                return Ok(());
            }
            self.clock.advance(DEFAULT_SPIN_STEP.min(deadline - now));
        }
    }
}
