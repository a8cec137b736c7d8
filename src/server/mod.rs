pub mod response;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use self::response::*;
use crate::err::*;
use crate::node::dispatcher::RequestListener;
use crate::node::Node;
use crate::protocol::*;
use crate::transport::cbor_codec;

type Handler<S> = dyn FnMut(
    &ReceivedRequest<<S as ServiceType>::Request>,
    &mut ServiceResponse<<S as ServiceType>::Response>,
);

/// Serves one service type on a node.
///
/// While started, every request of the type addressed to the node is decoded and passed to the
/// handler together with a `ServiceResponse` to fill in; the response then goes back to the
/// requester with the same transfer ID. At most one server per service type can be started on
/// a node. Drop the server, or call `stop`, to stop serving.
pub struct ServiceServer<S: ServiceType> {
    core: Rc<ServerCore<S>>,
}

struct ServerCore<S: ServiceType> {
    node: Node,
    self_ref: Weak<ServerCore<S>>,
    handler: RefCell<Option<Rc<RefCell<Handler<S>>>>>,
    data_type_id: Cell<Option<DataTypeId>>,
    request_failure_count: Cell<u64>,
    response_failure_count: Cell<u64>,
}

impl<S: ServiceType> ServiceServer<S> {
    pub fn new(node: &Node) -> Self {
        let core = Rc::new_cyclic(|self_ref| ServerCore {
            node: node.clone(),
            self_ref: self_ref.clone(),
            handler: RefCell::new(None),
            data_type_id: Cell::new(None),
            request_failure_count: Cell::new(0),
            response_failure_count: Cell::new(0),
        });
        ServiceServer { core }
    }

    /// Start serving with the given handler. If the server is already started only the
    /// handler is replaced. Errors if the service type is unknown to the node or another
    /// server already serves it.
    pub fn start(
        &mut self,
        handler: impl FnMut(&ReceivedRequest<S::Request>, &mut ServiceResponse<S::Response>) + 'static,
    ) -> ServiceResult<()> {
        let handler: Rc<RefCell<Handler<S>>> = Rc::new(RefCell::new(handler));

        if self.is_started() {
            *self.core.handler.borrow_mut() = Some(handler);
            return Ok(());
        }

        let data_type_id = self.core.node.data_type_id::<S>()?;
        let listener: Weak<dyn RequestListener> = self.core.self_ref.clone();
        self.core.node.add_server(data_type_id, S::FULL_NAME, listener)?;

        self.core.data_type_id.set(Some(data_type_id));
        *self.core.handler.borrow_mut() = Some(handler);
        debug!("[{}] serving {}", self.core.node.node_id(), S::FULL_NAME);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.core.stop();
    }

    pub fn is_started(&self) -> bool {
        self.core.data_type_id.get().is_some()
    }

    /// Requests that could not be decoded
    pub fn request_failure_count(&self) -> u64 {
        self.core.request_failure_count.get()
    }

    /// Responses that could not be encoded or were refused by the transport
    pub fn response_failure_count(&self) -> u64 {
        self.core.response_failure_count.get()
    }
}

impl<S: ServiceType> Drop for ServiceServer<S> {
    fn drop(&mut self) {
        self.core.stop();
    }
}

impl<S: ServiceType> ServerCore<S> {
    fn stop(&self) {
        if let Some(data_type_id) = self.data_type_id.take() {
            self.node.remove_server(data_type_id);
            self.handler.borrow_mut().take();
            debug!("[{}] stopped serving {}", self.node.node_id(), S::FULL_NAME);
        }
    }

    fn fail_request(&self) {
        self.request_failure_count.set(self.request_failure_count.get() + 1);
    }

    fn fail_response(&self) {
        self.response_failure_count.set(self.response_failure_count.get() + 1);
    }
}

impl<S: ServiceType> RequestListener for ServerCore<S> {
    fn handle_request(&self, frame: &Frame) {
        let handler = match self.handler.borrow().clone() {
            Some(handler) => handler,
            None => return,
        };

        let request: S::Request = match cbor_codec::deser(frame.payload.as_slice()) {
            Ok(request) => request,
            Err(e) => {
                self.fail_request();
                warn!("{} request from {} dropped: {}", S::FULL_NAME, frame.source, e);
                return;
            }
        };
        let request = ReceivedRequest::new(request, frame.source, frame.transfer_id);
        let mut response = ServiceResponse::new();

        match handler.try_borrow_mut() {
            Ok(mut handler) => (*handler)(&request, &mut response),
            Err(_) => {
                self.fail_request();
                warn!("{} handler is busy, request from {} dropped", S::FULL_NAME, frame.source);
                return;
            }
        }

        if !response.is_response_enabled() {
            debug!(
                "{} response to {} tid {} suppressed by handler",
                S::FULL_NAME,
                frame.source,
                frame.transfer_id
            );
            return;
        }

        let sent = cbor_codec::ser(&*response).and_then(|payload| {
            self.node
                .send_response(frame.source, frame.data_type_id, frame.transfer_id, payload)
        });
        if let Err(e) = sent {
            self.fail_response();
            warn!("{} response to {} not sent: {}", S::FULL_NAME, frame.source, e);
        }
    }
}
