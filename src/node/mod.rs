pub(crate) mod dispatcher;

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use self::dispatcher::*;
use crate::data_type::DataTypeRegistry;
use crate::err::*;
use crate::protocol::*;
use crate::registry::ListenerRegistry;
use crate::time::{Clock, SystemClock};
use crate::transfer_id::TransferIdAllocator;
use crate::transport::Transport;

/// Longest the scheduling driver lets the clock run between two passes over the inbound queue
pub const DEFAULT_SPIN_STEP: Duration = Duration::from_millis(1);

/// Builds a `Node`. The node ID and transport are mandatory, everything else has a default.
pub struct NodeBuilder {
    node_id: NodeId,
    clock: Option<Box<dyn Clock>>,
    spin_step: Duration,
}

impl NodeBuilder {
    pub fn new(node_id: NodeId) -> Self {
        NodeBuilder {
            node_id,
            clock: None,
            spin_step: DEFAULT_SPIN_STEP,
        }
    }

    /// Use the given clock instead of a `SystemClock`
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn spin_step(mut self, spin_step: Duration) -> Self {
        self.spin_step = spin_step;
        self
    }

    pub fn build(self, transport: impl Transport) -> ServiceResult<Node> {
        if !self.node_id.is_unicast() {
            return Err(ServiceError::InvalidNodeId(self.node_id.get()));
        }
        if self.spin_step.is_zero() {
            return Err(ServiceError::InternalError("spin step must not be zero".into()));
        }

        let core = NodeCore {
            node_id: self.node_id,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            spin_step: self.spin_step,
            transport: RefCell::new(Box::new(transport)),
            data_types: RefCell::new(DataTypeRegistry::new()),
            transfer_ids: RefCell::new(TransferIdAllocator::new()),
            dispatcher: RefCell::new(Dispatcher::new()),
        };

        Ok(Node { core: Rc::new(core) })
    }
}

/// A node on the bus: the context service clients and servers are created in.
///
/// `Node` is a cheap handle; clones refer to the same node. All work happens on the thread
/// that drives `spin`, nothing here is `Send`.
#[derive(Clone)]
pub struct Node {
    core: Rc<NodeCore>,
}

struct NodeCore {
    node_id: NodeId,
    clock: Box<dyn Clock>,
    spin_step: Duration,
    transport: RefCell<Box<dyn Transport>>,
    data_types: RefCell<DataTypeRegistry>,
    transfer_ids: RefCell<TransferIdAllocator>,
    dispatcher: RefCell<Dispatcher>,
}

impl Node {
    pub fn node_id(&self) -> NodeId {
        self.core.node_id
    }

    pub fn now(&self) -> Duration {
        self.core.clock.now()
    }

    pub fn spin_step(&self) -> Duration {
        self.core.spin_step
    }

    /// Make the service type `S` known to this node under its default ID
    pub fn register_data_type<S: ServiceType>(&self) -> ServiceResult<DataTypeId> {
        self.core.data_types.borrow_mut().register::<S>()
    }

    pub fn register_data_type_with_id<S: ServiceType>(&self, id: u16) -> ServiceResult<DataTypeId> {
        self.core.data_types.borrow_mut().register_with_id::<S>(id)
    }

    pub fn data_type_id<S: ServiceType>(&self) -> ServiceResult<DataTypeId> {
        self.core.data_types.borrow().resolve::<S>()
    }

    pub fn listener_registry(&self) -> Ref<'_, ListenerRegistry> {
        Ref::map(self.core.dispatcher.borrow(), |dispatcher| dispatcher.registry())
    }

    /// Number of active service servers on this node
    pub fn num_service_request_listeners(&self) -> usize {
        self.listener_registry().num_request_listeners()
    }

    /// Number of outstanding calls, over all clients and service types, waiting for a response
    pub fn num_service_response_listeners(&self) -> usize {
        self.listener_registry().num_response_listeners()
    }

    /// Number of clients with at least one pending call
    pub fn num_attached_clients(&self) -> usize {
        self.core.dispatcher.borrow().num_attached_clients()
    }

    /// Run the scheduling driver for `duration`: process inbound traffic and expire overdue
    /// calls, letting the clock run in steps of at most the configured spin step in between.
    pub fn spin(&self, duration: Duration) -> ServiceResult<()> {
        let deadline = self.now() + duration;
        loop {
            self.spin_once()?;

            let now = self.now();
            if now >= deadline {
                return Ok(());
            }
            self.core.clock.sleep(self.core.spin_step.min(deadline - now));
        }
    }

    /// One scheduling pass without advancing time. Every frame available now is delivered
    /// first, then every call whose deadline has passed is expired, so a response arriving in
    /// the same pass as its deadline still counts as a success.
    pub fn spin_once(&self) -> ServiceResult<()> {
        loop {
            let frame = self.core.transport.borrow_mut().receive()?;
            match frame {
                Some(frame) => self.dispatch(frame),
                None => break,
            }
        }

        let now = self.now();
        let clients = self.core.dispatcher.borrow().clients();
        for client in clients {
            client.expire(now);
        }

        Ok(())
    }

    fn dispatch(&self, frame: Frame) {
        #[cfg(debug_assertions)]
        trace!("[{}] --> {}", self.core.node_id, crate::debug::frame_to_string(&frame));

        if frame.destination != self.core.node_id {
            debug!("[{}] dropping frame addressed to node {}", self.core.node_id, frame.destination);
            return;
        }

        match frame.kind {
            TransferKind::Request => {
                let server = self.core.dispatcher.borrow().server_for(frame.data_type_id);
                match server {
                    Some(server) => server.handle_request(&frame),
                    None => debug!(
                        "[{}] no server for data type {}, request from {} dropped",
                        self.core.node_id, frame.data_type_id, frame.source
                    ),
                }
            }
            TransferKind::Response => {
                let clients = self.core.dispatcher.borrow().clients_for(frame.data_type_id);
                if !clients.iter().any(|client| client.handle_response(&frame)) {
                    debug!(
                        "[{}] unroutable response from {} tid {} dropped",
                        self.core.node_id, frame.source, frame.transfer_id
                    );
                }
            }
        }
    }

    pub(crate) fn next_listener_id(&self) -> ListenerId {
        self.core.dispatcher.borrow_mut().next_listener_id()
    }

    pub(crate) fn allocate_transfer_id(&self, data_type_id: DataTypeId, destination: NodeId) -> ServiceResult<TransferId> {
        self.core.transfer_ids.borrow_mut().allocate(data_type_id, destination)
    }

    pub(crate) fn release_transfer_id(&self, data_type_id: DataTypeId, destination: NodeId, transfer_id: TransferId) {
        self.core.transfer_ids.borrow_mut().release(data_type_id, destination, transfer_id)
    }

    /// Take one response listener slot for a newly issued call
    pub(crate) fn register_call(&self, data_type_id: DataTypeId) {
        self.core.dispatcher.borrow_mut().register_call(data_type_id);
    }

    /// Give back the listener slot and transfer ID of a call that has ended
    pub(crate) fn release_call(&self, data_type_id: DataTypeId, server_node_id: NodeId, transfer_id: TransferId) {
        self.release_transfer_id(data_type_id, server_node_id, transfer_id);
        if let Err(e) = self.core.dispatcher.borrow_mut().release_call(data_type_id) {
            error!("[{}] {}", self.core.node_id, e);
        }
    }

    pub(crate) fn attach_client(&self, id: ListenerId, data_type_id: DataTypeId, client: Weak<dyn ResponseListener>) {
        self.core.dispatcher.borrow_mut().attach_client(id, data_type_id, client);
    }

    pub(crate) fn detach_client(&self, id: ListenerId) {
        self.core.dispatcher.borrow_mut().detach_client(id);
    }

    pub(crate) fn add_server(&self, data_type_id: DataTypeId, name: &str, server: Weak<dyn RequestListener>) -> ServiceResult<()> {
        self.core.dispatcher.borrow_mut().add_server(data_type_id, name, server)
    }

    pub(crate) fn remove_server(&self, data_type_id: DataTypeId) {
        self.core.dispatcher.borrow_mut().remove_server(data_type_id);
    }

    pub(crate) fn send_request(
        &self,
        destination: NodeId,
        data_type_id: DataTypeId,
        transfer_id: TransferId,
        payload: Vec<u8>,
    ) -> ServiceResult<()> {
        self.send(destination, data_type_id, transfer_id, TransferKind::Request, payload)
    }

    pub(crate) fn send_response(
        &self,
        destination: NodeId,
        data_type_id: DataTypeId,
        transfer_id: TransferId,
        payload: Vec<u8>,
    ) -> ServiceResult<()> {
        self.send(destination, data_type_id, transfer_id, TransferKind::Response, payload)
    }

    fn send(
        &self,
        destination: NodeId,
        data_type_id: DataTypeId,
        transfer_id: TransferId,
        kind: TransferKind,
        payload: Vec<u8>,
    ) -> ServiceResult<()> {
        let frame = Frame {
            source: self.core.node_id,
            destination,
            data_type_id,
            transfer_id,
            kind,
            payload: payload.into(),
        };

        #[cfg(debug_assertions)]
        trace!("[{}] <-- {}", self.core.node_id, crate::debug::frame_to_string(&frame));

        self.core.transport.borrow_mut().send(frame)
    }
}
