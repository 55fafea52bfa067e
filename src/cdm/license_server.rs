//! Test-only counterpart of a Widevine license server.
//!
//! Implements just enough of the server side of the exchange to issue
//! verifiable license responses against challenges produced by
//! [`crate::cdm::Session`], so the full redemption path can be
//! exercised without network access or real credentials.

use std::sync::OnceLock;

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use hmac::{Hmac, Mac};
use prost::Message;
use rand::RngCore;
use rsa::traits::RandomizedEncryptor;
use rsa::{RsaPrivateKey, RsaPublicKey, oaep};
use sha1::Sha1;
use sha2::Sha256;

use crate::cdm::crypto;
use crate::cdm::proto;

/// Shared 1024-bit test key. Generation is expensive in debug builds,
/// so it happens once per test binary.
pub(crate) fn test_rsa_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rsa::rand_core::OsRng;
        RsaPrivateKey::new(&mut rng, 1024).expect("RSA keygen")
    })
    .clone()
}

pub(crate) fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad = block_size - data.len() % block_size;
    let mut out = data.to_vec();
    out.extend(std::iter::repeat(pad as u8).take(pad));
    out
}

/// AES-128-CBC encryption of a block-aligned plaintext.
pub(crate) fn aes_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    assert!(plaintext.len() % 16 == 0, "plaintext must be padded");

    let cipher = Aes128::new(key.into());
    let mut ciphertext = Vec::with_capacity(plaintext.len());
    let mut chain = *iv;

    for chunk in plaintext.chunks_exact(16) {
        let mut block = [0u8; 16];
        for (b, (p, c)) in block.iter_mut().zip(chunk.iter().zip(chain.iter())) {
            *b = p ^ c;
        }
        let mut block = *GenericArray::from_slice(&block);
        cipher.encrypt_block(&mut block);
        ciphertext.extend_from_slice(&block);
        chain.copy_from_slice(&block);
    }

    ciphertext
}

pub(crate) fn rsa_oaep_sha1_encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Vec<u8> {
    let encrypting_key = oaep::EncryptingKey::<Sha1>::new(public_key.clone());
    let mut rng = rsa::rand_core::OsRng;
    encrypting_key
        .encrypt_with_rng(&mut rng, plaintext)
        .expect("OAEP encryption of a 16-byte key")
}

fn hmac_sha256_sign(key: &[u8; 32], msg: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Issue a signed license response for a challenge.
///
/// Each entry in `keys` is `(key id, key bytes, container type)`. The
/// response follows the real exchange: a fresh session key is wrapped
/// with the device public key, the derivation contexts come from the
/// request bytes inside the challenge, keys are AES-CBC encrypted with
/// the derived encryption key, and the whole message is HMAC-signed
/// with the derived server MAC key.
pub(crate) fn issue(
    challenge: &[u8],
    device_public_key: &RsaPublicKey,
    keys: &[([u8; 16], Vec<u8>, i32)],
) -> Vec<u8> {
    let signed = proto::SignedMessage::decode(challenge).expect("well-formed challenge");
    assert_eq!(signed.r#type, Some(proto::MESSAGE_TYPE_LICENSE_REQUEST));
    let request_bytes = signed.msg.expect("challenge carries request bytes");

    let mut rng = rand::rng();
    let mut session_key = [0u8; 16];
    rng.fill_bytes(&mut session_key);

    let enc_context = crypto::build_enc_context(&request_bytes);
    let mac_context = crypto::build_mac_context(&request_bytes);
    let derived = crypto::derive_keys(&enc_context, &mac_context, &session_key);

    let mut containers = Vec::with_capacity(keys.len());
    for (kid, key, key_type) in keys {
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut iv);
        let encrypted = aes_cbc_encrypt(&derived.enc_key, &iv, &pkcs7_pad(key, 16));
        containers.push(proto::KeyContainer {
            id: Some(kid.to_vec()),
            iv: Some(iv.to_vec()),
            key: Some(encrypted),
            r#type: Some(*key_type),
        });
    }

    let license = proto::License { key: containers };
    let license_bytes = license.encode_to_vec();
    let signature = hmac_sha256_sign(&derived.mac_key_server, &license_bytes);
    let wrapped_session_key = rsa_oaep_sha1_encrypt(device_public_key, &session_key);

    proto::SignedMessage {
        r#type: Some(proto::MESSAGE_TYPE_LICENSE),
        msg: Some(license_bytes),
        signature: Some(signature),
        session_key: Some(wrapped_session_key),
        oemcrypto_core_message: None,
    }
    .encode_to_vec()
}
