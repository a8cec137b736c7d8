use std::{fmt, rc::Rc};

use crate::protocol::{NodeId, ServiceType, TransferId};

/// Identity of one service call: which server it went to and the transfer ID it went out with.
/// Only meaningful while the call is pending, transfer IDs are reused.
#[derive(Clone, Copy, Serialize, PartialEq, Eq, Hash, Debug)]
pub struct CallId {
    pub server_node_id: NodeId,
    pub transfer_id: TransferId,
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node {} tid {}", self.server_node_id, self.transfer_id)
    }
}

#[derive(Clone, Copy, Serialize, PartialEq, Eq, Debug)]
pub enum CallStatus {
    Success,
    ErrorTimeout,
}

/// The terminal outcome of a service call. Every call that is not abandoned by dropping its
/// client produces exactly one of these.
pub enum ServiceCallResult<S: ServiceType> {
    Success { call_id: CallId, response: S::Response },
    ErrorTimeout { call_id: CallId },
}

impl<S: ServiceType> ServiceCallResult<S> {
    pub fn status(&self) -> CallStatus {
        match self {
            ServiceCallResult::Success { .. } => CallStatus::Success,
            ServiceCallResult::ErrorTimeout { .. } => CallStatus::ErrorTimeout,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == CallStatus::Success
    }

    pub fn call_id(&self) -> CallId {
        match self {
            ServiceCallResult::Success { call_id, .. } => *call_id,
            ServiceCallResult::ErrorTimeout { call_id } => *call_id,
        }
    }

    pub fn server_node_id(&self) -> NodeId {
        self.call_id().server_node_id
    }

    /// The response, if the call succeeded
    pub fn response(&self) -> Option<&S::Response> {
        match self {
            ServiceCallResult::Success { response, .. } => Some(response),
            ServiceCallResult::ErrorTimeout { .. } => None,
        }
    }
}

impl<S: ServiceType> Clone for ServiceCallResult<S> {
    fn clone(&self) -> Self {
        match self {
            ServiceCallResult::Success { call_id, response } => ServiceCallResult::Success {
                call_id: *call_id,
                response: response.clone(),
            },
            ServiceCallResult::ErrorTimeout { call_id } => ServiceCallResult::ErrorTimeout { call_id: *call_id },
        }
    }
}

impl<S: ServiceType> PartialEq for ServiceCallResult<S> {
    fn eq(&self, other: &Self) -> bool {
        self.call_id() == other.call_id() && self.response() == other.response()
            && self.status() == other.status()
    }
}

impl<S: ServiceType> fmt::Debug for ServiceCallResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceCallResult::Success { call_id, response } => f
                .debug_struct("Success")
                .field("call_id", call_id)
                .field("response", response)
                .finish(),
            ServiceCallResult::ErrorTimeout { call_id } => {
                f.debug_struct("ErrorTimeout").field("call_id", call_id).finish()
            }
        }
    }
}

impl<S: ServiceType> fmt::Display for ServiceCallResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceCallResult::Success { call_id, response } => {
                write!(f, "{} {}: Success {:?}", S::FULL_NAME, call_id, response)
            }
            ServiceCallResult::ErrorTimeout { call_id } => {
                write!(f, "{} {}: ErrorTimeout", S::FULL_NAME, call_id)
            }
        }
    }
}

/// Receives the results of a client's calls.
///
/// The callback is a cheap, cloneable handle to a closure. The same callback may be set on any
/// number of clients; each still reports only its own calls.
pub struct ServiceCallback<S: ServiceType> {
    target: Rc<dyn Fn(&ServiceCallResult<S>)>,
}

impl<S: ServiceType> ServiceCallback<S> {
    pub fn new(target: impl Fn(&ServiceCallResult<S>) + 'static) -> Self {
        ServiceCallback {
            target: Rc::new(target),
        }
    }

    /// True if both handles refer to the same closure
    pub fn ptr_eq(&self, other: &ServiceCallback<S>) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }

    pub(crate) fn invoke(&self, result: &ServiceCallResult<S>) {
        (self.target)(result)
    }
}

impl<S: ServiceType> Clone for ServiceCallback<S> {
    fn clone(&self) -> Self {
        ServiceCallback {
            target: self.target.clone(),
        }
    }
}
