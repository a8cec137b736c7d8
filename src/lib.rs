//! # UAVCAN Service
//!
//! The service call (request/response) layer of a UAVCAN style bus.
//!
//! A `ServiceClient` sends requests to a `ServiceServer` on another node and is told the outcome
//! of every call exactly once through its callback: either the response, or a timeout when no
//! response arrived before the call's deadline. Clients and servers live on a `Node`, which owns
//! the transport, the clock and the bookkeeping shared by everything on the node.
//!
//! Everything is single threaded and cooperative. Nothing happens in the background; the node's
//! scheduling driver (`Node::spin`) delivers arrived frames, runs server handlers and expires
//! overdue calls.
//!
//! ## Service types
//!
//! A service type pairs a request with a response under a full name such as
//! `root_ns_a.StringService`. Each node resolves the name to a numeric data type ID, so a type
//! has to be registered before it can be served or called:
//!
//! ```ignore
//! node.register_data_type::<StringService>()?;
//! ```
//!
//! ## Calling a service
//!
//! The example below runs two nodes on an in-process bus with a simulated clock. Node A serves
//! `StringService`, node B calls it.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use uavcan_service::prelude::*;
//! use uavcan_service::services::*;
//!
//! # fn main() -> ServiceResult<()> {
//! let nodes = InterlinkedNodes::new()?;
//! nodes.register_data_type::<StringService>()?;
//!
//! // Node A answers every request
//! let mut server = ServiceServer::<StringService>::new(&nodes.a);
//! server.start(|request, response| {
//!     response.string_response = format!("Request string: {}", request.string_request);
//! })?;
//!
//! // Node B collects the results of its calls
//! let results = Rc::new(RefCell::new(Vec::new()));
//! let sink = results.clone();
//! let mut client = ServiceClient::<StringService>::new(&nodes.b);
//! client.set_callback(ServiceCallback::new(move |result: &ServiceCallResult<StringService>| {
//!     sink.borrow_mut().push(result.clone());
//! }));
//!
//! let request = StringRequest { string_request: "Hello world".to_string() };
//! client.call(NodeId::new(1), &request)?;
//! nodes.spin_both(Duration::from_millis(20))?;
//!
//! let results = results.borrow();
//! assert!(results[0].is_success());
//! assert_eq!("Request string: Hello world", results[0].response().unwrap().string_response);
//! # Ok(())
//! # }
//! ```
//!
//! ## Timeouts and suppressed responses
//!
//! Every call gets a deadline of its client's request timeout after it was issued. A call with no
//! response by then ends with `ServiceCallResult::ErrorTimeout`. A server handler may decide not
//! to answer at all with `ServiceResponse::set_response_enabled(false)`; for the caller this is
//! the same as a lost response.
//!
//! Dropping a client abandons its pending calls. Their callbacks are never invoked.

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

pub mod client;
pub mod data_type;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod services;
pub mod sim;
pub mod time;
pub(crate) mod transfer_id;
pub mod transport;
pub(crate) mod err;
#[cfg(debug_assertions)]
pub(crate) mod debug;
pub mod prelude;

#[cfg(test)]
pub mod test;

pub use err::*;
pub use client::ServiceClient;
pub use client::result::{CallId, CallStatus, ServiceCallResult, ServiceCallback};
pub use server::ServiceServer;
pub use server::response::{ReceivedRequest, ServiceResponse};
pub use node::{Node, NodeBuilder};
pub use protocol::{DataTypeId, NodeId, ServiceType, TransferId};
