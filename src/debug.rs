use crate::protocol::{Frame, TransferKind};

pub fn frame_to_string(frame: &Frame) -> String {
    let kind = match frame.kind {
        TransferKind::Request => "REQ",
        TransferKind::Response => "RSP",
    };
    format!(
        "{:>3} -> {:<3} {} #{:<3} tid {:<2} ({}) {}",
        frame.source.get(),
        frame.destination.get(),
        kind,
        frame.data_type_id.0,
        frame.transfer_id.get(),
        &frame.payload,
        hex::encode(frame.payload.as_slice())
    )
}
