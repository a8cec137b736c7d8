use crate::err::*;
use crate::protocol::{DataTypeId, ServiceType};
use regex::Regex;
use std::collections::HashMap;

pub const MAX_SERVICE_DATA_TYPE_ID: u16 = 255;

lazy_static! {
    static ref RGX_FULL_NAME: Regex =
        Regex::new(r"^([a-z_][a-z0-9_]*\.)+[A-Z][A-Za-z0-9_]*$").unwrap();
}

#[test]
fn test_rgx_full_name() {
    assert!(RGX_FULL_NAME.is_match("uavcan.protocol.GetNodeInfo"));
    assert!(RGX_FULL_NAME.is_match("root_ns_a.StringService"));
    assert!(RGX_FULL_NAME.is_match("a.B"));
    assert!(RGX_FULL_NAME.is_match("ns0.sub_1.Type2"));

    assert!(!RGX_FULL_NAME.is_match("StringService"));
    assert!(!RGX_FULL_NAME.is_match("root_ns_a."));
    assert!(!RGX_FULL_NAME.is_match(".StringService"));
    assert!(!RGX_FULL_NAME.is_match("Root.StringService"));
    assert!(!RGX_FULL_NAME.is_match("root.stringService"));
    assert!(!RGX_FULL_NAME.is_match("root..StringService"));
    assert!(!RGX_FULL_NAME.is_match("0root.StringService"));
}

pub(crate) fn validate_full_name(full_name: &str) -> ServiceResult<()> {
    if !RGX_FULL_NAME.is_match(full_name) {
        return Err(ServiceError::InvalidDataTypeName(full_name.to_string()));
    }
    Ok(())
}

/// Maps service type names to the numeric IDs used on the wire.
///
/// Each node owns one registry. Both ends of a service call must agree on the ID of a type,
/// so register the same types with the same IDs on every node.
#[derive(Default)]
pub struct DataTypeRegistry {
    by_name: HashMap<&'static str, DataTypeId>,
    by_id: HashMap<DataTypeId, &'static str>,
}

impl DataTypeRegistry {
    pub fn new() -> DataTypeRegistry {
        DataTypeRegistry::default()
    }

    /// Register `S` under its default ID
    pub fn register<S: ServiceType>(&mut self) -> ServiceResult<DataTypeId> {
        self.register_with_id::<S>(S::DEFAULT_DATA_TYPE_ID)
    }

    /// Register `S` under the given ID. Registering a type again with the same ID is a no-op.
    /// Errors if the name is malformed, the ID is out of the service range, or either the
    /// name or the ID is already registered to something else.
    pub fn register_with_id<S: ServiceType>(&mut self, id: u16) -> ServiceResult<DataTypeId> {
        validate_full_name(S::FULL_NAME)?;

        if id > MAX_SERVICE_DATA_TYPE_ID {
            return Err(ServiceError::InvalidDataTypeId(id));
        }
        let id = DataTypeId(id);

        if let Some(&existing) = self.by_name.get(S::FULL_NAME) {
            return if existing == id {
                Ok(id)
            } else {
                Err(ServiceError::DataTypeIdCollision(existing.0, S::FULL_NAME.to_string()))
            };
        }

        if let Some(owner) = self.by_id.get(&id) {
            return Err(ServiceError::DataTypeIdCollision(id.0, owner.to_string()));
        }

        self.by_name.insert(S::FULL_NAME, id);
        self.by_id.insert(id, S::FULL_NAME);
        debug!("Registered data type {} as {}", S::FULL_NAME, id);
        Ok(id)
    }

    pub fn resolve<S: ServiceType>(&self) -> ServiceResult<DataTypeId> {
        self.by_name
            .get(S::FULL_NAME)
            .copied()
            .ok_or_else(|| ServiceError::UnknownDataType(S::FULL_NAME.to_string()))
    }

    pub fn name_of(&self, id: DataTypeId) -> Option<&'static str> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
