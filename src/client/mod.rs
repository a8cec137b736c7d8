mod core;
mod pending;
pub mod result;

use std::rc::Rc;
use std::time::Duration;

use self::core::*;
use self::result::*;
use crate::err::*;
use crate::node::Node;
use crate::protocol::*;

/// Timeout for calls issued by a client that was never given one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(1);
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How many calls a client can have in flight unless told otherwise
pub const DEFAULT_MAX_PENDING_CALLS: usize = 4;

/// A client of one service type. Issues calls to servers on other nodes and reports the
/// outcome of each call, success or timeout, exactly once through its callback.
///
/// Results are delivered from within `Node::spin`. `N` is the number of calls the client can
/// have in flight at the same time.
///
/// Drop the client to abandon its pending calls: their listener slots are released and their
/// callbacks are never invoked. A response arriving afterwards is simply dropped.
pub struct ServiceClient<S: ServiceType, const N: usize = { DEFAULT_MAX_PENDING_CALLS }> {
    core: Rc<ClientCore<S, N>>,
}

impl<S: ServiceType, const N: usize> ServiceClient<S, N> {
    pub fn new(node: &Node) -> Self {
        ServiceClient {
            core: ClientCore::new(node, DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Set the callback that receives the results of all calls issued from now on, and of
    /// those still pending.
    pub fn set_callback(&mut self, callback: ServiceCallback<S>) {
        self.core.set_callback(callback);
    }

    /// The current callback, to share it with other clients
    pub fn get_callback(&self) -> Option<ServiceCallback<S>> {
        self.core.callback()
    }

    /// Applies to calls issued after this point. Clamped to
    /// `MIN_REQUEST_TIMEOUT..=MAX_REQUEST_TIMEOUT`.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.core
            .set_request_timeout(timeout.clamp(MIN_REQUEST_TIMEOUT, MAX_REQUEST_TIMEOUT));
    }

    pub fn request_timeout(&self) -> Duration {
        self.core.request_timeout()
    }

    /// Send `request` to the server at `server_node_id`.
    ///
    /// `Ok` only means the request was submitted; the outcome arrives later through the
    /// callback. On error nothing was sent and nothing is pending.
    pub fn call(&mut self, server_node_id: NodeId, request: &S::Request) -> ServiceResult<CallId> {
        self.core.call(server_node_id, request)
    }

    pub fn has_pending_calls(&self) -> bool {
        self.num_pending_calls() > 0
    }

    pub fn num_pending_calls(&self) -> usize {
        self.core.num_pending_calls()
    }

    pub fn is_pending(&self, call_id: CallId) -> bool {
        self.core.is_pending(call_id)
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<S: ServiceType, const N: usize> Drop for ServiceClient<S, N> {
    fn drop(&mut self) {
        self.core.release_all();
    }
}
