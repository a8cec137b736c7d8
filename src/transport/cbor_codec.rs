use crate::err::*;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a request or response payload
pub fn ser<T: Serialize>(value: &T) -> ServiceResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)?;
    Ok(bytes)
}

/// Decode a request or response payload
pub fn deser<T: DeserializeOwned>(bytes: &[u8]) -> ServiceResult<T> {
    let value = ciborium::de::from_reader(bytes)?;
    Ok(value)
}

#[test]
fn test_deser_garbage() {
    let result: ServiceResult<String> = deser(&[0xff, 0x00, 0x13][..]);
    assert!(matches!(result, Err(ServiceError::MalformedPayload(_))));
}

#[test]
fn test_unit_payload_is_small() {
    assert_eq!(1, ser(&()).unwrap().len());
}
