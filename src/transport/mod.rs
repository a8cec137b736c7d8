use crate::err::*;
use crate::protocol::Frame;

pub mod cbor_codec;
pub mod memory;

/// The transfer layer a node sends and receives service transfers through.
///
/// Implementations deliver complete, already reassembled transfers. Reassembly, CRC and
/// arbitration all happen below this trait.
pub trait Transport: 'static {
    /// Queue a transfer for transmission. An error means the transfer was rejected and will
    /// never be sent.
    fn send(&mut self, frame: Frame) -> ServiceResult<()>;

    /// Take the next received transfer addressed to this node, if any. Never blocks.
    fn receive(&mut self) -> ServiceResult<Option<Frame>>;
}
