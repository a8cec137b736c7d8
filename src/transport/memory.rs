use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::{
    err::*,
    protocol::{Frame, NodeId},
};

use super::Transport;

/// Largest payload the memory bus accepts by default, matching a UAVCAN v0 service transfer
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 256;

/// An in-process bus. Nodes attach to it by node ID with `connect` and exchange frames through
/// memory queues. Frames addressed to a node ID nobody is attached as are lost, just like on a
/// physical bus.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Rc<RefCell<BusInner>>,
}

struct BusInner {
    max_payload_len: usize,
    nodes: HashMap<NodeId, UnboundedSender<Frame>>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_max_payload_len(DEFAULT_MAX_PAYLOAD_LEN)
    }

    pub fn with_max_payload_len(max_payload_len: usize) -> Self {
        MemoryBus {
            inner: Rc::new(RefCell::new(BusInner {
                max_payload_len,
                nodes: HashMap::new(),
            })),
        }
    }

    /// Attach a node to the bus. Errors if the ID is not unicast or is already attached.
    pub fn connect(&self, node_id: NodeId) -> ServiceResult<MemoryTransport> {
        if !node_id.is_unicast() {
            return Err(ServiceError::InvalidNodeId(node_id.get()));
        }

        let mut inner = self.inner.borrow_mut();
        if inner.nodes.contains_key(&node_id) {
            return Err(ServiceError::NodeIdInUse(node_id.get()));
        }

        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        inner.nodes.insert(node_id, sender);

        Ok(MemoryTransport {
            node_id,
            bus: self.clone(),
            receiver,
        })
    }

    pub fn is_attached(&self, node_id: NodeId) -> bool {
        self.inner.borrow().nodes.contains_key(&node_id)
    }
}

/// One node's end of a `MemoryBus`. Dropping it detaches the node.
pub struct MemoryTransport {
    node_id: NodeId,
    bus: MemoryBus,
    receiver: UnboundedReceiver<Frame>,
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: Frame) -> ServiceResult<()> {
        let inner = self.bus.inner.borrow();

        if frame.payload.len() > inner.max_payload_len {
            return Err(ServiceError::TransportRejected(format!(
                "payload of {} exceeds the bus limit of {} bytes",
                frame.payload,
                inner.max_payload_len
            )));
        }

        if !frame.destination.is_unicast() {
            return Err(ServiceError::TransportRejected(format!(
                "service transfers need a unicast destination, got {}",
                frame.destination
            )));
        }

        match inner.nodes.get(&frame.destination) {
            Some(sender) => sender.send(frame)?,
            None => {
                trace!("[{}] nobody on the bus as node {}, frame lost", self.node_id, frame.destination);
            }
        }

        Ok(())
    }

    fn receive(&mut self) -> ServiceResult<Option<Frame>> {
        match self.receiver.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ServiceError::ChannelClosed),
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.bus.inner.borrow_mut().nodes.remove(&self.node_id);
    }
}
