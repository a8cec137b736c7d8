use crate::err::*;
use crate::protocol::DataTypeId;
use std::collections::{HashMap, HashSet};

/// The `ListenerRegistry` keeps count of who is interested in service traffic on a node.
///
/// Request listeners are claims: at most one server per data type. Response listeners are
/// reference counts: one registration per outstanding call, so a client with three pending
/// calls holds three. Every register must be paired with exactly one deregister.
#[derive(Default)]
pub struct ListenerRegistry {
    request: HashSet<DataTypeId>,
    response: HashMap<DataTypeId, usize>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> ListenerRegistry {
        ListenerRegistry::default()
    }

    /// Claim the request stream of the given data type. Errors if it is already claimed.
    pub(crate) fn register_request_listener(&mut self, data_type_id: DataTypeId, name: &str) -> ServiceResult<()> {
        if !self.request.insert(data_type_id) {
            return Err(ServiceError::ServerAlreadyRegistered(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn deregister_request_listener(&mut self, data_type_id: DataTypeId) {
        self.request.remove(&data_type_id);
    }

    pub(crate) fn register_response_listener(&mut self, data_type_id: DataTypeId) {
        *self.response.entry(data_type_id).or_insert(0) += 1;
    }

    /// Errors without touching the count if no registration is left to release.
    pub(crate) fn deregister_response_listener(&mut self, data_type_id: DataTypeId) -> ServiceResult<()> {
        match self.response.get_mut(&data_type_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(())
            }
            Some(_) => {
                self.response.remove(&data_type_id);
                Ok(())
            }
            None => Err(ServiceError::ListenerUnderflow(data_type_id.0)),
        }
    }

    pub fn has_request_listener(&self, data_type_id: DataTypeId) -> bool {
        self.request.contains(&data_type_id)
    }

    pub fn num_request_listeners(&self) -> usize {
        self.request.len()
    }

    pub fn num_response_listeners(&self) -> usize {
        self.response.values().sum()
    }

    pub fn num_response_listeners_for(&self, data_type_id: DataTypeId) -> usize {
        self.response.get(&data_type_id).copied().unwrap_or(0)
    }
}

#[test]
fn test_request_listener_claim() {
    let mut subject = ListenerRegistry::new();
    subject.register_request_listener(DataTypeId(1), "a.B").unwrap();
    assert_eq!(
        ServiceError::ServerAlreadyRegistered("a.B".into()),
        subject.register_request_listener(DataTypeId(1), "a.B").unwrap_err()
    );
    subject.register_request_listener(DataTypeId(2), "a.C").unwrap();
    assert_eq!(2, subject.num_request_listeners());
    assert!(subject.has_request_listener(DataTypeId(1)));
}

#[test]
fn test_request_listener_unclaim() {
    let mut subject = ListenerRegistry::new();
    subject.register_request_listener(DataTypeId(1), "a.B").unwrap();
    subject.deregister_request_listener(DataTypeId(1));
    assert_eq!(0, subject.num_request_listeners());
    subject.register_request_listener(DataTypeId(1), "a.B").unwrap();
}

#[test]
fn test_response_listener_counting() {
    let mut subject = ListenerRegistry::new();
    subject.register_response_listener(DataTypeId(1));
    subject.register_response_listener(DataTypeId(1));
    subject.register_response_listener(DataTypeId(2));
    assert_eq!(3, subject.num_response_listeners());
    assert_eq!(2, subject.num_response_listeners_for(DataTypeId(1)));

    subject.deregister_response_listener(DataTypeId(1)).unwrap();
    subject.deregister_response_listener(DataTypeId(1)).unwrap();
    assert_eq!(0, subject.num_response_listeners_for(DataTypeId(1)));
    assert_eq!(1, subject.num_response_listeners());
}

#[test]
fn test_response_listener_never_negative() {
    let mut subject = ListenerRegistry::new();
    assert_eq!(
        ServiceError::ListenerUnderflow(7),
        subject.deregister_response_listener(DataTypeId(7)).unwrap_err()
    );
    subject.register_response_listener(DataTypeId(7));
    subject.deregister_response_listener(DataTypeId(7)).unwrap();
    subject.deregister_response_listener(DataTypeId(7)).unwrap_err();
    assert_eq!(0, subject.num_response_listeners());
}
