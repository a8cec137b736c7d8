use std::time::Duration;

use super::result::CallId;
use crate::err::*;

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) struct PendingCall {
    pub(crate) call_id: CallId,
    pub(crate) deadline: Duration,
}

/// Fixed capacity storage for the calls a client has in flight. Slots are reused, the table
/// never grows.
pub(crate) struct PendingCallTable<const N: usize> {
    slots: [Option<PendingCall>; N],
}

impl<const N: usize> PendingCallTable<N> {
    pub(crate) fn new() -> Self {
        PendingCallTable { slots: [None; N] }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    pub(crate) fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    /// Store the call in a free slot and return the slot index
    pub(crate) fn insert(&mut self, call: PendingCall) -> ServiceResult<usize> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(ServiceError::PendingTableFull(N))?;
        self.slots[index] = Some(call);
        Ok(index)
    }

    pub(crate) fn contains(&self, call_id: CallId) -> bool {
        self.find(call_id).is_some()
    }

    pub(crate) fn remove(&mut self, call_id: CallId) -> Option<PendingCall> {
        let index = self.find(call_id)?;
        self.slots[index].take()
    }

    /// Remove and return the overdue call with the earliest deadline, if any
    pub(crate) fn take_expired(&mut self, now: Duration) -> Option<PendingCall> {
        let index = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|call| (index, call.deadline)))
            .filter(|(_, deadline)| *deadline <= now)
            .min_by_key(|(_, deadline)| *deadline)
            .map(|(index, _)| index)?;
        self.slots[index].take()
    }

    /// Remove and return any call
    pub(crate) fn take_any(&mut self) -> Option<PendingCall> {
        self.slots.iter_mut().find_map(|slot| slot.take())
    }

    fn find(&self, call_id: CallId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(call) if call.call_id == call_id))
    }
}
