pub use crate::err::*;
pub use crate::protocol::{DataTypeId, NodeId, ServiceType, TransferId};
pub use crate::node::{Node, NodeBuilder};
pub use crate::client::ServiceClient;
pub use crate::client::result::{CallId, CallStatus, ServiceCallResult, ServiceCallback};
pub use crate::server::ServiceServer;
pub use crate::server::response::{ReceivedRequest, ServiceResponse};
pub use crate::sim::InterlinkedNodes;
pub use crate::time::{Clock, SimClock, SystemClock};
pub use crate::transport::Transport;
pub use crate::transport::memory::MemoryBus;
