use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use rand::{Rng, RngCore};

use crate::cdm::crypto;
use crate::cdm::device::Device;
use crate::cdm::error::{CdmError, CdmResult};
use crate::cdm::proto;
use crate::cdm::types::{ContentKey, KeyType};

/// A one-shot license exchange session: a pure value derived from the
/// device credentials and a content's init data.
///
/// Sessions hold no mutable state and are never shared between
/// requests. Challenge generation and license parsing are independent
/// operations: the key-derivation contexts are a function of the
/// serialized request bytes, which travel inside the challenge itself,
/// so a fresh session built from the same `(device, init data)` pair
/// can redeem a challenge produced by an earlier one.
pub struct Session {
    device: Device,
    init_data: Vec<u8>,
}

impl Session {
    /// Build a session from device credentials and a decoded PSSH blob.
    pub fn new(device: Device, pssh_blob: &[u8]) -> CdmResult<Self> {
        let init_data = crate::cdm::pssh::init_data(pssh_blob)?;
        Ok(Session { device, init_data })
    }

    /// Build a license challenge: a serialized `SignedMessage` carrying
    /// an RSA-PSS-signed `LicenseRequest` for this session's content.
    ///
    /// Returns the raw bytes a client would POST to a license server.
    pub fn build_license_challenge(&self) -> CdmResult<Vec<u8>> {
        let mut rng = rand::rng();

        let mut request_id = vec![0u8; 16];
        rng.fill_bytes(&mut request_id);

        // Range [1, 2^31): fits a signed int32 and avoids the protobuf
        // default 0.
        let key_control_nonce: u32 = rng.random_range(1..2_147_483_648);

        let request_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let request = proto::LicenseRequest {
            client_id: Some(self.device.client_id.clone()),
            content_id: Some(proto::ContentIdentification {
                widevine_pssh_data: Some(proto::WidevinePsshData {
                    pssh_data: vec![self.init_data.clone()],
                    license_type: Some(proto::LICENSE_TYPE_STREAMING),
                    request_id: Some(request_id),
                }),
            }),
            r#type: Some(proto::REQUEST_TYPE_NEW),
            request_time: Some(request_time),
            protocol_version: Some(proto::PROTOCOL_VERSION_2_1),
            key_control_nonce: Some(key_control_nonce),
        };

        let request_bytes = request.encode_to_vec();
        let signature = crypto::rsa_pss_sha1_sign(&self.device.private_key, &request_bytes)?;

        let signed = proto::SignedMessage {
            r#type: Some(proto::MESSAGE_TYPE_LICENSE_REQUEST),
            msg: Some(request_bytes),
            signature: Some(signature),
            session_key: None,
            oemcrypto_core_message: None,
        };

        Ok(signed.encode_to_vec())
    }

    /// Redeem a license response against the challenge that produced it.
    ///
    /// The derivation contexts are rebuilt from the request bytes inside
    /// `challenge`, the session key is recovered with RSA-OAEP, the
    /// response signature is verified with HMAC-SHA256, and every
    /// recognized key container is decrypted.
    pub fn extract_license_keys(
        &self,
        challenge: &[u8],
        response: &[u8],
    ) -> CdmResult<Vec<ContentKey>> {
        let request_bytes = challenge_request_bytes(challenge)?;

        let signed = proto::SignedMessage::decode(response)?;
        let msg_type = signed.r#type.unwrap_or(0);
        if msg_type != proto::MESSAGE_TYPE_LICENSE {
            return Err(CdmError::ProtobufDecode(format!(
                "expected LICENSE message (type {}), got type {msg_type}",
                proto::MESSAGE_TYPE_LICENSE,
            )));
        }

        let msg = signed
            .msg
            .as_deref()
            .ok_or_else(|| CdmError::ProtobufDecode("missing msg in SignedMessage".into()))?;
        let signature = signed
            .signature
            .as_deref()
            .ok_or_else(|| CdmError::ProtobufDecode("missing signature in SignedMessage".into()))?;
        let wrapped_session_key = signed.session_key.as_deref().ok_or_else(|| {
            CdmError::ProtobufDecode("missing session_key in SignedMessage".into())
        })?;

        let session_key_vec =
            crypto::rsa_oaep_sha1_decrypt(&self.device.private_key, wrapped_session_key)?;
        let session_key: [u8; 16] = session_key_vec.try_into().map_err(|v: Vec<u8>| {
            CdmError::RsaOperation(format!("session key is {} bytes, expected 16", v.len()))
        })?;

        let enc_context = crypto::build_enc_context(&request_bytes);
        let mac_context = crypto::build_mac_context(&request_bytes);
        let derived = crypto::derive_keys(&enc_context, &mac_context, &session_key);

        crypto::verify_license_signature(
            &derived.mac_key_server,
            signed.oemcrypto_core_message.as_deref(),
            msg,
            signature,
        )?;

        let license = proto::License::decode(msg)?;

        let mut keys = Vec::new();
        for container in &license.key {
            let (Some(iv), Some(encrypted_key)) = (container.iv.as_deref(), container.key.as_deref())
            else {
                continue;
            };

            // Skip unrecognized key types (including the proto default 0).
            let Some(key_type) = KeyType::from_i32(container.r#type.unwrap_or(0)) else {
                continue;
            };

            let decrypted = crypto::aes_cbc_decrypt_key(&derived.enc_key, iv, encrypted_key)?;
            let key_bytes = crypto::pkcs7_unpad(&decrypted, 16)?;

            keys.push(ContentKey {
                kid: kid_to_uuid(container.id.as_deref().unwrap_or_default()),
                key: key_bytes,
                key_type,
            });
        }

        if keys.is_empty() {
            return Err(CdmError::NoContentKeys);
        }

        Ok(keys)
    }
}

/// Pull the serialized `LicenseRequest` bytes out of a challenge.
fn challenge_request_bytes(challenge: &[u8]) -> CdmResult<Vec<u8>> {
    let signed = proto::SignedMessage::decode(challenge)?;
    let msg_type = signed.r#type.unwrap_or(0);
    if msg_type != proto::MESSAGE_TYPE_LICENSE_REQUEST {
        return Err(CdmError::ProtobufDecode(format!(
            "expected LICENSE_REQUEST challenge (type {}), got type {msg_type}",
            proto::MESSAGE_TYPE_LICENSE_REQUEST,
        )));
    }
    signed
        .msg
        .ok_or_else(|| CdmError::ProtobufDecode("missing msg in challenge".into()))
}

/// Normalize a key ID to exactly 16 bytes (UUID size).
///
/// Some servers send the key ID as a decimal string; that parses to an
/// integer rendered big-endian. Anything else is padded with trailing
/// zeros or truncated.
fn kid_to_uuid(kid: &[u8]) -> [u8; 16] {
    if let Ok(s) = std::str::from_utf8(kid) {
        if let Ok(n) = s.parse::<u128>() {
            return n.to_be_bytes();
        }
    }

    let mut uuid = [0u8; 16];
    let len = kid.len().min(16);
    uuid[..len].copy_from_slice(&kid[..len]);
    uuid
}
