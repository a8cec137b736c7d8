use std::ops::{Deref, DerefMut};

use crate::protocol::{NodeId, TransferId};

/// A decoded request as handed to a server's handler. Dereferences to the request itself.
#[derive(Clone, Debug)]
pub struct ReceivedRequest<R> {
    request: R,
    source_node_id: NodeId,
    transfer_id: TransferId,
}

impl<R> ReceivedRequest<R> {
    pub(crate) fn new(request: R, source_node_id: NodeId, transfer_id: TransferId) -> Self {
        ReceivedRequest {
            request,
            source_node_id,
            transfer_id,
        }
    }

    /// The node the request came from, and the response will go to
    pub fn source_node_id(&self) -> NodeId {
        self.source_node_id
    }

    pub fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }
}

impl<R> Deref for ReceivedRequest<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.request
    }
}

/// The response a server's handler fills in. Dereferences to the response itself.
///
/// Sending is enabled by default. A handler that disables it makes the server stay silent for
/// this request; the caller will see a timeout.
#[derive(Clone, Debug)]
pub struct ServiceResponse<R> {
    response: R,
    enabled: bool,
}

impl<R: Default> ServiceResponse<R> {
    pub(crate) fn new() -> Self {
        ServiceResponse {
            response: R::default(),
            enabled: true,
        }
    }
}

impl<R> ServiceResponse<R> {
    pub fn set_response_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_response_enabled(&self) -> bool {
        self.enabled
    }
}

impl<R> Deref for ServiceResponse<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.response
    }
}

impl<R> DerefMut for ServiceResponse<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.response
    }
}
