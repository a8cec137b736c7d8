use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Describes one service data type: a request and the response it is answered with.
///
/// Implement this on a marker type for each service on your bus. The `FULL_NAME` is resolved
/// to a numeric `DataTypeId` by the node's data type registry, see `Node::register_data_type`.
pub trait ServiceType: 'static {
    /// Fully qualified DSDL style name, for example `root_ns_a.StringService`.
    const FULL_NAME: &'static str;
    /// The ID the type is registered under unless another one is given explicitly.
    const DEFAULT_DATA_TYPE_ID: u16;

    type Request: Serialize + DeserializeOwned + fmt::Debug + Clone + 'static;
    type Response: Serialize + DeserializeOwned + fmt::Debug + Clone + Default + PartialEq + 'static;
}

/// Identifier of a node on the bus. Zero is the broadcast (unset) ID.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u8);

impl NodeId {
    pub const BROADCAST: NodeId = NodeId(0);
    pub const MAX: u8 = 127;

    pub const fn new(value: u8) -> NodeId {
        NodeId(value)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self.0 == 0
    }

    /// True if the ID addresses exactly one node
    pub fn is_unicast(self) -> bool {
        self.0 >= 1 && self.0 <= NodeId::MAX
    }
}

impl From<u8> for NodeId {
    fn from(value: u8) -> Self {
        NodeId(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cyclic transfer counter. Only the low `TransferId::BIT_LEN` bits are significant.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct TransferId(u8);

impl TransferId {
    pub const BIT_LEN: u32 = 5;
    pub const MAX: u8 = (1 << TransferId::BIT_LEN) - 1;

    pub const fn new(value: u8) -> TransferId {
        TransferId(value & TransferId::MAX)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn next(self) -> TransferId {
        TransferId::new(self.0.wrapping_add(1))
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct DataTypeId(pub u16);

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum TransferKind {
    Request,
    Response,
}

/// An already reassembled service transfer as handed over by the transport.
#[derive(Clone, PartialEq, Debug)]
pub struct Frame {
    pub source: NodeId,
    pub destination: NodeId,
    pub data_type_id: DataTypeId,
    pub transfer_id: TransferId,
    pub kind: TransferKind,
    pub payload: Payload,
}

/// Encoded transfer payload. Cheap to clone.
#[derive(Clone, PartialEq, Default)]
pub struct Payload {
    data: Bytes,
}

impl Payload {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes", self.data.len())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Payload({})", hex::encode(&self.data[..]))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload { data: Bytes::from(data) }
    }
}

impl From<Payload> for Vec<u8> {
    fn from(payload: Payload) -> Self {
        payload.data.to_vec()
    }
}

#[test]
fn test_transfer_id_wraps() {
    assert_eq!(TransferId::new(31).next(), TransferId::new(0));
    assert_eq!(TransferId::new(5).next().get(), 6);
    assert_eq!(TransferId::new(33).get(), 1);
}

#[test]
fn test_node_id_unicast() {
    assert!(!NodeId::BROADCAST.is_unicast());
    assert!(NodeId::from(1).is_unicast());
    assert!(NodeId::from(127).is_unicast());
    assert!(!NodeId::from(128).is_unicast());
}
