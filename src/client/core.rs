use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::pending::*;
use super::result::*;
use crate::err::*;
use crate::node::dispatcher::{ListenerId, ResponseListener};
use crate::node::Node;
use crate::protocol::*;
use crate::transport::cbor_codec;

struct ClientState<S: ServiceType, const N: usize> {
    callback: Option<ServiceCallback<S>>,
    request_timeout: Duration,
    data_type_id: Option<DataTypeId>,
    pending: PendingCallTable<N>,
}

/// The lifecycle engine behind a `ServiceClient`.
///
/// Every pending call holds one response listener slot and one transfer ID on the node. Both
/// are given back exactly once: on completion, on expiry, or in `release_all` when the client
/// is dropped. The client is attached to the node's dispatcher exactly while it has pending
/// calls.
pub(crate) struct ClientCore<S: ServiceType, const N: usize> {
    node: Node,
    listener_id: ListenerId,
    self_ref: Weak<ClientCore<S, N>>,
    state: RefCell<ClientState<S, N>>,
}

impl<S: ServiceType, const N: usize> ClientCore<S, N> {
    pub(crate) fn new(node: &Node, request_timeout: Duration) -> Rc<Self> {
        let listener_id = node.next_listener_id();
        Rc::new_cyclic(|self_ref| ClientCore {
            node: node.clone(),
            listener_id,
            self_ref: self_ref.clone(),
            state: RefCell::new(ClientState {
                callback: None,
                request_timeout,
                data_type_id: None,
                pending: PendingCallTable::new(),
            }),
        })
    }

    pub(crate) fn set_callback(&self, callback: ServiceCallback<S>) {
        self.state.borrow_mut().callback = Some(callback);
    }

    pub(crate) fn callback(&self) -> Option<ServiceCallback<S>> {
        self.state.borrow().callback.clone()
    }

    pub(crate) fn set_request_timeout(&self, request_timeout: Duration) {
        self.state.borrow_mut().request_timeout = request_timeout;
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.state.borrow().request_timeout
    }

    pub(crate) fn num_pending_calls(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub(crate) fn is_pending(&self, call_id: CallId) -> bool {
        self.state.borrow().pending.contains(call_id)
    }

    pub(crate) fn call(&self, server_node_id: NodeId, request: &S::Request) -> ServiceResult<CallId> {
        if !server_node_id.is_unicast() || server_node_id == self.node.node_id() {
            return Err(ServiceError::InvalidNodeId(server_node_id.get()));
        }

        let request_timeout = {
            let state = self.state.borrow();
            if state.callback.is_none() {
                return Err(ServiceError::CallbackNotSet);
            }
            if state.pending.is_full() {
                return Err(ServiceError::PendingTableFull(N));
            }
            state.request_timeout
        };

        let data_type_id = self.node.data_type_id::<S>()?;
        let payload = cbor_codec::ser(request)?;
        let transfer_id = self.node.allocate_transfer_id(data_type_id, server_node_id)?;
        let call_id = CallId {
            server_node_id,
            transfer_id,
        };

        if let Err(e) = self.node.send_request(server_node_id, data_type_id, transfer_id, payload) {
            self.node.release_transfer_id(data_type_id, server_node_id, transfer_id);
            warn!("{} call to {} not submitted: {}", S::FULL_NAME, server_node_id, e);
            return Err(e);
        }

        let deadline = self.node.now() + request_timeout;
        let was_idle = {
            let mut state = self.state.borrow_mut();
            let was_idle = state.pending.is_empty();
            if let Err(e) = state.pending.insert(PendingCall { call_id, deadline }) {
                drop(state);
                self.node.release_transfer_id(data_type_id, server_node_id, transfer_id);
                return Err(e);
            }
            state.data_type_id = Some(data_type_id);
            was_idle
        };

        self.node.register_call(data_type_id);
        if was_idle {
            let listener: Weak<dyn ResponseListener> = self.self_ref.clone();
            self.node.attach_client(self.listener_id, data_type_id, listener);
        }

        debug!(
            "{} call {} issued, deadline {:?}",
            S::FULL_NAME,
            call_id,
            deadline
        );
        Ok(call_id)
    }

    /// Give back every resource held by pending calls without reporting them
    pub(crate) fn release_all(&self) {
        let data_type_id = self.state.borrow().data_type_id;
        let mut abandoned = 0;

        loop {
            let call = self.state.borrow_mut().pending.take_any();
            let (call, data_type_id) = match (call, data_type_id) {
                (Some(call), Some(data_type_id)) => (call, data_type_id),
                _ => break,
            };
            self.node.release_call(data_type_id, call.call_id.server_node_id, call.call_id.transfer_id);
            abandoned += 1;
        }

        self.node.detach_client(self.listener_id);

        if abandoned > 0 {
            debug!("{} client dropped, {} pending calls abandoned", S::FULL_NAME, abandoned);
        }
    }

    /// Bookkeeping shared by completion and expiry. Runs after the call has left the table and
    /// before the callback sees the result.
    fn end_call(&self, data_type_id: DataTypeId, call_id: CallId, now_idle: bool) {
        self.node.release_call(data_type_id, call_id.server_node_id, call_id.transfer_id);
        if now_idle {
            self.node.detach_client(self.listener_id);
        }
    }

    fn deliver(&self, callback: Option<ServiceCallback<S>>, result: ServiceCallResult<S>) {
        debug!("{}", result);
        match callback {
            Some(callback) => callback.invoke(&result),
            None => warn!("{} result dropped, no callback: {}", S::FULL_NAME, result),
        }
    }
}

impl<S: ServiceType, const N: usize> ResponseListener for ClientCore<S, N> {
    fn handle_response(&self, frame: &Frame) -> bool {
        let call_id = CallId {
            server_node_id: frame.source,
            transfer_id: frame.transfer_id,
        };

        let data_type_id = {
            let state = self.state.borrow();
            match state.data_type_id {
                Some(data_type_id) if state.pending.contains(call_id) => data_type_id,
                _ => return false,
            }
        };

        let response: S::Response = match cbor_codec::deser(frame.payload.as_slice()) {
            Ok(response) => response,
            Err(e) => {
                // the call stays pending and will time out
                warn!("{} response for {} dropped: {}", S::FULL_NAME, call_id, e);
                return true;
            }
        };

        let (callback, now_idle) = {
            let mut state = self.state.borrow_mut();
            state.pending.remove(call_id);
            (state.callback.clone(), state.pending.is_empty())
        };

        self.end_call(data_type_id, call_id, now_idle);
        self.deliver(callback, ServiceCallResult::Success { call_id, response });
        true
    }

    fn expire(&self, now: Duration) {
        loop {
            let expired = {
                let mut state = self.state.borrow_mut();
                match (state.pending.take_expired(now), state.data_type_id) {
                    (Some(call), Some(data_type_id)) => {
                        Some((call, data_type_id, state.callback.clone(), state.pending.is_empty()))
                    }
                    _ => None,
                }
            };

            let (call, data_type_id, callback, now_idle) = match expired {
                Some(expired) => expired,
                None => return,
            };

            self.end_call(data_type_id, call.call_id, now_idle);
            self.deliver(callback, ServiceCallResult::ErrorTimeout { call_id: call.call_id });
        }
    }
}
