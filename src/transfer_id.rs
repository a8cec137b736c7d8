use crate::err::*;
use crate::protocol::{DataTypeId, NodeId, TransferId};
use std::collections::HashMap;

const NUM_TRANSFER_IDS: u8 = TransferId::MAX + 1;

#[derive(Default)]
struct Counter {
    next: TransferId,
    in_use: u32,
}

impl Counter {
    fn is_in_use(&self, transfer_id: TransferId) -> bool {
        self.in_use & (1 << transfer_id.get()) != 0
    }
}

/// Hands out transfer IDs for outgoing service requests.
///
/// There is one cyclic counter per `(data type, destination)` pair. An ID stays reserved until
/// the call it was issued for is released, so two calls in flight to the same server never
/// share an identity, whichever client issued them.
#[derive(Default)]
pub(crate) struct TransferIdAllocator {
    counters: HashMap<(DataTypeId, NodeId), Counter>,
}

impl TransferIdAllocator {
    pub(crate) fn new() -> TransferIdAllocator {
        TransferIdAllocator::default()
    }

    /// Reserve the next free ID, skipping any that are still in flight
    pub(crate) fn allocate(&mut self, data_type_id: DataTypeId, destination: NodeId) -> ServiceResult<TransferId> {
        let counter = self.counters.entry((data_type_id, destination)).or_default();

        let mut candidate = counter.next;
        for _ in 0..NUM_TRANSFER_IDS {
            if !counter.is_in_use(candidate) {
                counter.in_use |= 1 << candidate.get();
                counter.next = candidate.next();
                return Ok(candidate);
            }
            candidate = candidate.next();
        }

        Err(ServiceError::NoTransferIdAvailable)
    }

    pub(crate) fn release(&mut self, data_type_id: DataTypeId, destination: NodeId, transfer_id: TransferId) {
        if let Some(counter) = self.counters.get_mut(&(data_type_id, destination)) {
            counter.in_use &= !(1 << transfer_id.get());
        }
    }
}

#[test]
fn test_allocate_cycles() {
    let mut subject = TransferIdAllocator::new();
    let dtid = DataTypeId(1);
    let node = NodeId::new(5);

    for expected in 0..=TransferId::MAX {
        let tid = subject.allocate(dtid, node).unwrap();
        assert_eq!(expected, tid.get());
        subject.release(dtid, node, tid);
    }

    assert_eq!(0, subject.allocate(dtid, node).unwrap().get());
}

#[test]
fn test_allocate_independent_per_destination() {
    let mut subject = TransferIdAllocator::new();
    let dtid = DataTypeId(1);

    assert_eq!(0, subject.allocate(dtid, NodeId::new(5)).unwrap().get());
    assert_eq!(0, subject.allocate(dtid, NodeId::new(6)).unwrap().get());
    assert_eq!(0, subject.allocate(DataTypeId(2), NodeId::new(5)).unwrap().get());
    assert_eq!(1, subject.allocate(dtid, NodeId::new(5)).unwrap().get());
}

#[test]
fn test_allocate_skips_in_flight() {
    let mut subject = TransferIdAllocator::new();
    let dtid = DataTypeId(1);
    let node = NodeId::new(5);

    let first = subject.allocate(dtid, node).unwrap();
    for _ in 1..=TransferId::MAX {
        let tid = subject.allocate(dtid, node).unwrap();
        subject.release(dtid, node, tid);
    }

    // wrapped around, ID 0 is still in flight
    assert_eq!(1, subject.allocate(dtid, node).unwrap().get());
    subject.release(dtid, node, first);
}

#[test]
fn test_allocate_exhausted() {
    let mut subject = TransferIdAllocator::new();
    let dtid = DataTypeId(1);
    let node = NodeId::new(5);

    for _ in 0..NUM_TRANSFER_IDS {
        subject.allocate(dtid, node).unwrap();
    }
    assert_eq!(ServiceError::NoTransferIdAvailable, subject.allocate(dtid, node).unwrap_err());

    subject.release(dtid, node, TransferId::new(17));
    assert_eq!(17, subject.allocate(dtid, node).unwrap().get());
}
