//! Service types used by the simulator and the tests.

use crate::protocol::ServiceType;

/// Answers a string with a string
pub struct StringService;

#[derive(Clone, Deserialize, Serialize, PartialEq, Debug, Default)]
pub struct StringRequest {
    pub string_request: String,
}

#[derive(Clone, Deserialize, Serialize, PartialEq, Debug, Default)]
pub struct StringResponse {
    pub string_response: String,
}

impl ServiceType for StringService {
    const FULL_NAME: &'static str = "root_ns_a.StringService";
    const DEFAULT_DATA_TYPE_ID: u16 = 200;

    type Request = StringRequest;
    type Response = StringResponse;
}

/// Carries nothing either way. Useful as a ping.
pub struct EmptyService;

#[derive(Clone, Deserialize, Serialize, PartialEq, Debug, Default)]
pub struct EmptyRequest {}

#[derive(Clone, Deserialize, Serialize, PartialEq, Debug, Default)]
pub struct EmptyResponse {}

impl ServiceType for EmptyService {
    const FULL_NAME: &'static str = "root_ns_a.EmptyService";
    const DEFAULT_DATA_TYPE_ID: u16 = 201;

    type Request = EmptyRequest;
    type Response = EmptyResponse;
}
