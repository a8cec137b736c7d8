use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::err::*;
use crate::protocol::{DataTypeId, Frame};
use crate::registry::ListenerRegistry;

/// Something that answers inbound requests of one data type. Implemented by servers.
pub(crate) trait RequestListener {
    fn handle_request(&self, frame: &Frame);
}

/// Something that owns pending calls. Implemented by clients.
pub(crate) trait ResponseListener {
    /// Complete the pending call the frame answers. Returns false if the frame is not for us.
    fn handle_response(&self, frame: &Frame) -> bool;

    /// Time out every pending call whose deadline is at or before `now`
    fn expire(&self, now: Duration);
}

pub(crate) type ListenerId = u64;

/// Routing tables of a node. Holds weak references only: servers and clients own themselves
/// and detach on drop.
pub(crate) struct Dispatcher {
    registry: ListenerRegistry,
    servers: HashMap<DataTypeId, Weak<dyn RequestListener>>,
    clients: BTreeMap<ListenerId, (DataTypeId, Weak<dyn ResponseListener>)>,
    next_listener_id: ListenerId,
}

impl Dispatcher {
    pub(crate) fn new() -> Dispatcher {
        Dispatcher {
            registry: ListenerRegistry::new(),
            servers: HashMap::new(),
            clients: BTreeMap::new(),
            next_listener_id: 0,
        }
    }

    pub(crate) fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub(crate) fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener_id += 1;
        self.next_listener_id
    }

    pub(crate) fn add_server(
        &mut self,
        data_type_id: DataTypeId,
        name: &str,
        server: Weak<dyn RequestListener>,
    ) -> ServiceResult<()> {
        self.registry.register_request_listener(data_type_id, name)?;
        self.servers.insert(data_type_id, server);
        Ok(())
    }

    pub(crate) fn remove_server(&mut self, data_type_id: DataTypeId) {
        self.registry.deregister_request_listener(data_type_id);
        self.servers.remove(&data_type_id);
    }

    pub(crate) fn server_for(&self, data_type_id: DataTypeId) -> Option<Rc<dyn RequestListener>> {
        self.servers.get(&data_type_id).and_then(|server| server.upgrade())
    }

    pub(crate) fn register_call(&mut self, data_type_id: DataTypeId) {
        self.registry.register_response_listener(data_type_id);
    }

    pub(crate) fn release_call(&mut self, data_type_id: DataTypeId) -> ServiceResult<()> {
        self.registry.deregister_response_listener(data_type_id)
    }

    pub(crate) fn attach_client(
        &mut self,
        id: ListenerId,
        data_type_id: DataTypeId,
        client: Weak<dyn ResponseListener>,
    ) {
        self.clients.insert(id, (data_type_id, client));
    }

    pub(crate) fn detach_client(&mut self, id: ListenerId) {
        self.clients.remove(&id);
    }

    pub(crate) fn num_attached_clients(&self) -> usize {
        self.clients.len()
    }

    /// Clients that currently wait for responses of the given data type, in attach order
    pub(crate) fn clients_for(&self, data_type_id: DataTypeId) -> Vec<Rc<dyn ResponseListener>> {
        self.clients
            .values()
            .filter(|(client_type, _)| *client_type == data_type_id)
            .filter_map(|(_, client)| client.upgrade())
            .collect()
    }

    pub(crate) fn clients(&self) -> Vec<Rc<dyn ResponseListener>> {
        self.clients
            .values()
            .filter_map(|(_, client)| client.upgrade())
            .collect()
    }
}
