use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError{
    #[error("Invalid node ID: {0}")]
    InvalidNodeId(u8),
    #[error("Node ID already attached to the bus: {0}")]
    NodeIdInUse(u8),

    #[error("Call failed: No callback set")]
    CallbackNotSet,
    #[error("Call failed: Pending call table is full ({0} slots)")]
    PendingTableFull(usize),
    #[error("Call failed: No transfer ID available")]
    NoTransferIdAvailable,
    #[error("Transport rejected the transfer: {0}")]
    TransportRejected(String),

    #[error("Start server failed: A server for {0} is already registered")]
    ServerAlreadyRegistered(String),
    #[error("Listener count underflow for data type #{0}")]
    ListenerUnderflow(u16),

    #[error("Unknown data type: {0}")]
    UnknownDataType(String),
    #[error("Invalid data type name: {0}")]
    InvalidDataTypeName(String),
    #[error("Invalid service data type ID: {0}")]
    InvalidDataTypeId(u16),
    #[error("Data type ID #{0} is already taken by {1}")]
    DataTypeIdCollision(u16, String),

    #[error("Deserialize payload failed: {0}")]
    MalformedPayload(String),
    #[error("Serialize payload failed: {0}")]
    UnserializablePayload(String),

    #[error("Channel closed by peer")]
    ChannelClosed,
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for ServiceError {
    fn from(error: ciborium::ser::Error<T>) -> Self {
        ServiceError::UnserializablePayload(error.to_string())
    }
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for ServiceError {
    fn from(error: ciborium::de::Error<T>) -> Self {
        ServiceError::MalformedPayload(error.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ServiceError {
    fn from(_error: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ServiceError::ChannelClosed
    }
}

impl From<serde_json::error::Error> for ServiceError {
    fn from(error: serde_json::error::Error) -> Self {
        ServiceError::UnserializablePayload(error.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
