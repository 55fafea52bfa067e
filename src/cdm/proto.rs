//! Hand-declared subset of Google's `license_protocol.proto`.
//!
//! Field tags match the upstream proto definitions; only the fields this
//! gateway actually reads or writes are declared. prost skips unknown
//! fields on decode, so real license-server responses with the full
//! message set still parse.

/// Envelope for both directions of the exchange.
///
/// Upstream: `SignedMessage` (type=1, msg=2, signature=3, session_key=4,
/// oemcrypto_core_message=9; the remaining fields are not used here).
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignedMessage {
    #[prost(int32, optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub msg: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub signature: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub session_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "9")]
    pub oemcrypto_core_message: Option<Vec<u8>>,
}

/// `SignedMessage.MessageType` values.
pub const MESSAGE_TYPE_LICENSE_REQUEST: i32 = 1;
pub const MESSAGE_TYPE_LICENSE: i32 = 2;

/// Challenge body, serialized into `SignedMessage.msg`.
///
/// `client_id` is carried as an opaque blob rather than a decoded
/// `ClientIdentification` message. Both encodings are length-delimited,
/// so the wire bytes are identical and the device blob passes through
/// untouched.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LicenseRequest {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub client_id: Option<Vec<u8>>,
    #[prost(message, optional, tag = "2")]
    pub content_id: Option<ContentIdentification>,
    #[prost(int32, optional, tag = "3")]
    pub r#type: Option<i32>,
    #[prost(int64, optional, tag = "4")]
    pub request_time: Option<i64>,
    #[prost(int32, optional, tag = "6")]
    pub protocol_version: Option<i32>,
    #[prost(uint32, optional, tag = "7")]
    pub key_control_nonce: Option<u32>,
}

/// `LicenseRequest.RequestType.NEW`.
pub const REQUEST_TYPE_NEW: i32 = 1;

/// `ProtocolVersion.VERSION_2_1`.
pub const PROTOCOL_VERSION_2_1: i32 = 21;

/// Upstream this is a oneof over several identification schemes; only
/// the Widevine PSSH variant is carried, which flattens to a single
/// optional message field with the same tag.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ContentIdentification {
    #[prost(message, optional, tag = "1")]
    pub widevine_pssh_data: Option<WidevinePsshData>,
}

/// `ContentIdentification.WidevinePsshData`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WidevinePsshData {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub pssh_data: Vec<Vec<u8>>,
    #[prost(int32, optional, tag = "2")]
    pub license_type: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub request_id: Option<Vec<u8>>,
}

/// `LicenseType.STREAMING`.
pub const LICENSE_TYPE_STREAMING: i32 = 1;

/// License body, serialized into `SignedMessage.msg` of the response.
/// Only the key containers (tag 3) are read.
#[derive(Clone, PartialEq, prost::Message)]
pub struct License {
    #[prost(message, repeated, tag = "3")]
    pub key: Vec<KeyContainer>,
}

/// `License.KeyContainer`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyContainer {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub id: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub iv: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub key: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "4")]
    pub r#type: Option<i32>,
}
