//! Cryptographic helpers for the license exchange.
//!
//! All parameter choices here (SHA-1 everywhere RSA is involved, AES-CMAC
//! derivation labels, HMAC-SHA256 over the response) are mandated by the
//! protocol, not implementation preferences.

use aes::Aes128;
use aes::cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray};
use cmac::{Cmac, Mac};
use hmac::Hmac;
use rsa::{RsaPrivateKey, oaep, pss, traits::Decryptor};
use sha1::Sha1;
use sha2::Sha256;
use signature::RandomizedSigner;

use crate::cdm::error::{CdmError, CdmResult};

/// Keys derived from the session key via AES-128-CMAC (RFC 4493).
///
/// The client MAC key (counter bytes 0x03/0x04) is only needed for
/// license renewal requests, which this gateway does not issue.
pub(crate) struct DerivedKeys {
    /// 16 bytes. CMAC(session_key, 0x01 || enc_context).
    /// Decrypts `KeyContainer.key` fields.
    pub enc_key: [u8; 16],
    /// 32 bytes. CMAC(session_key, 0x01 || mac_context)
    /// || CMAC(session_key, 0x02 || mac_context).
    /// Verifies the license response signature.
    pub mac_key_server: [u8; 32],
}

/// Encryption derivation context for a serialized LicenseRequest:
/// `b"ENCRYPTION" || 0x00 || request_bytes || [0x00, 0x00, 0x00, 0x80]`.
pub(crate) fn build_enc_context(request_bytes: &[u8]) -> Vec<u8> {
    build_context(b"ENCRYPTION\x00", request_bytes, [0x00, 0x00, 0x00, 0x80])
}

/// Authentication derivation context for a serialized LicenseRequest:
/// `b"AUTHENTICATION" || 0x00 || request_bytes || [0x00, 0x00, 0x02, 0x00]`.
pub(crate) fn build_mac_context(request_bytes: &[u8]) -> Vec<u8> {
    build_context(b"AUTHENTICATION\x00", request_bytes, [0x00, 0x00, 0x02, 0x00])
}

fn build_context(label: &[u8], request_bytes: &[u8], trailer: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(label.len() + request_bytes.len() + trailer.len());
    out.extend_from_slice(label);
    out.extend_from_slice(request_bytes);
    out.extend_from_slice(&trailer);
    out
}

/// Derive the exchange keys from the recovered session key.
pub(crate) fn derive_keys(
    enc_context: &[u8],
    mac_context: &[u8],
    session_key: &[u8; 16],
) -> DerivedKeys {
    let enc_key = aes_cmac(session_key, 0x01, enc_context);

    let mut mac_key_server = [0u8; 32];
    mac_key_server[..16].copy_from_slice(&aes_cmac(session_key, 0x01, mac_context));
    mac_key_server[16..].copy_from_slice(&aes_cmac(session_key, 0x02, mac_context));

    DerivedKeys {
        enc_key,
        mac_key_server,
    }
}

/// Single AES-128-CMAC block over `counter || context`.
fn aes_cmac(key: &[u8; 16], counter: u8, context: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(key)
        .expect("CMAC key length is always valid for AES-128");
    mac.update(&[counter]);
    mac.update(context);
    mac.finalize().into_bytes().into()
}

/// HMAC-SHA256 verification of the license response signature.
///
/// The message is `oemcrypto_core_message || msg` when the response
/// carries an OEMCrypto core message, otherwise just `msg`.
pub(crate) fn verify_license_signature(
    mac_key_server: &[u8; 32],
    oemcrypto_core_message: Option<&[u8]>,
    msg: &[u8],
    expected_signature: &[u8],
) -> CdmResult<()> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(mac_key_server)
        .expect("HMAC accepts any key length");
    if let Some(core) = oemcrypto_core_message {
        mac.update(core);
    }
    mac.update(msg);
    mac.verify_slice(expected_signature)
        .map_err(|_| CdmError::HmacMismatch)
}

/// AES-128-CBC decryption of an encrypted content key.
///
/// Output is still PKCS#7-padded; callers unpad via [`pkcs7_unpad`].
pub(crate) fn aes_cbc_decrypt_key(
    enc_key: &[u8; 16],
    iv: &[u8],
    ciphertext: &[u8],
) -> CdmResult<Vec<u8>> {
    if iv.len() != 16 || ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CdmError::AesCbcInvalidInput(
            "IV must be 16 bytes and ciphertext must be non-empty and block-aligned".into(),
        ));
    }

    let cipher = Aes128::new(enc_key.into());
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut chain: [u8; 16] = iv.try_into().expect("length checked above");

    for chunk in ciphertext.chunks_exact(16) {
        let mut block = *GenericArray::from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for (p, c) in block.iter().zip(chain.iter()) {
            plaintext.push(p ^ c);
        }
        chain.copy_from_slice(chunk);
    }

    Ok(plaintext)
}

/// Remove PKCS#7 padding from a decrypted block-aligned plaintext.
pub(crate) fn pkcs7_unpad(data: &[u8], block_size: usize) -> CdmResult<Vec<u8>> {
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CdmError::Pkcs7PaddingInvalid);
    }

    let pad = data[data.len() - 1] as usize;
    if pad == 0 || pad > block_size || pad > data.len() {
        return Err(CdmError::Pkcs7PaddingInvalid);
    }
    if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(CdmError::Pkcs7PaddingInvalid);
    }

    Ok(data[..data.len() - pad].to_vec())
}

/// RSA-PSS-SHA1 signing of the serialized LicenseRequest.
///
/// Salt length is 20 bytes (the SHA-1 digest length). The message is
/// passed raw — the signing key hashes internally, so pre-hashing here
/// would double-hash and produce an invalid signature.
pub(crate) fn rsa_pss_sha1_sign(
    private_key: &RsaPrivateKey,
    message: &[u8],
) -> CdmResult<Vec<u8>> {
    let signing_key = pss::SigningKey::<Sha1>::new_with_salt_len(private_key.clone(), 20);
    let mut rng = rsa::rand_core::OsRng;
    let signature = signing_key
        .try_sign_with_rng(&mut rng, message)
        .map_err(|e| CdmError::RsaOperation(e.to_string()))?;

    let bytes: Box<[u8]> = signature.into();
    Ok(bytes.into_vec())
}

/// RSA-OAEP-SHA1 decryption of `SignedMessage.session_key`.
///
/// The expected plaintext is a 16-byte AES key; length validation
/// happens at the call site when converting to `[u8; 16]`.
pub(crate) fn rsa_oaep_sha1_decrypt(
    private_key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> CdmResult<Vec<u8>> {
    let decrypting_key = oaep::DecryptingKey::<Sha1>::new(private_key.clone());
    decrypting_key
        .decrypt(ciphertext)
        .map_err(|e| CdmError::RsaOperation(e.to_string()))
}
