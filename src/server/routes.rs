//! Request handlers for the license exchange and passkey management.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use data_encoding::BASE64;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::cdm::Session;
use crate::error::{GatewayError, Result};
use crate::passkey::{self, Tier};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub pssh: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    #[serde(default)]
    pub pssh: String,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub license: String,
}

#[derive(Debug, Deserialize)]
pub struct ArsenalKeyRequest {
    #[serde(default)]
    pub pssh: String,
}

#[derive(Debug, Deserialize)]
pub struct AddPasskeyRequest {
    #[serde(default)]
    pub su: i64,
    #[serde(default)]
    pub sudoer: i64,
}

#[derive(Debug, Deserialize)]
pub struct RevokePasskeyRequest {
    #[serde(default)]
    pub passkey: String,
}

/// POST /v1/challenge — build a license challenge for a PSSH.
pub async fn challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<Value>> {
    if req.pssh.is_empty() {
        return Err(GatewayError::MissingField("pssh"));
    }

    let session = open_session(&state, &req.pssh).await?;
    let challenge = session.build_license_challenge()?;

    Ok(Json(json!({
        "challenge": BASE64.encode(&challenge),
        "pssh": req.pssh,
    })))
}

/// POST /v1/key — redeem a license response, cache and return the keys.
pub async fn key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<Value>> {
    if req.challenge.is_empty() || req.license.is_empty() || req.pssh.is_empty() {
        return Err(GatewayError::MissingField("license or challenge or pssh"));
    }

    let session = open_session(&state, &req.pssh).await?;
    let challenge = decode_base64("challenge", &req.challenge)?;
    let license = decode_base64("license", &req.license)?;

    let keys = session.extract_license_keys(&challenge, &license)?;

    let mut decryption_key = String::new();
    for key in keys.iter().filter(|k| k.is_content()) {
        decryption_key.push_str(&hex::encode(key.kid));
        decryption_key.push(':');
        decryption_key.push_str(&hex::encode(&key.key));
    }

    // A cache write failure must not cost the caller keys they already
    // paid a license exchange for.
    if let Err(e) = state
        .store
        .insert_key(req.pssh.clone(), decryption_key.clone())
        .await
    {
        eprintln!("[server] Failed to cache key for pssh: {e}");
    }

    Ok(Json(json!({
        "key": decryption_key,
        "pssh": req.pssh,
    })))
}

/// POST /v1/arsenal/key — look up a previously cached key by PSSH.
pub async fn arsenal_key(
    State(state): State<AppState>,
    Json(req): Json<ArsenalKeyRequest>,
) -> Result<Json<Value>> {
    if req.pssh.is_empty() {
        return Err(GatewayError::MissingField("pssh"));
    }

    let record = state.store.get_key(req.pssh).await?;

    Ok(Json(json!({
        "key": record.decryption_key,
        "pssh": record.pssh,
    })))
}

/// POST /su/passkey — mint a new passkey at the requested tier.
pub async fn add_passkey(
    State(state): State<AppState>,
    Json(req): Json<AddPasskeyRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let token = passkey::generate()?;
    let tier = Tier::from_flags(req.su, req.sudoer);
    state.store.insert_passkey(token.clone(), tier).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "passkey": token,
            "message": "Save the passkey, without it you won't be able to request for keys",
        })),
    ))
}

/// POST /su/revoke — revoke an issued passkey.
pub async fn revoke_passkey(
    State(state): State<AppState>,
    Json(req): Json<RevokePasskeyRequest>,
) -> Result<Json<Value>> {
    if req.passkey.is_empty() {
        return Err(GatewayError::MissingField("passkey"));
    }

    state.store.revoke_passkey(req.passkey).await?;

    Ok(Json(json!({
        "success": true,
        "message": "access has been revoked",
    })))
}

/// Build a one-shot CDM session for a transport-encoded PSSH.
///
/// Credentials are re-read from disk each time so rotation needs no
/// restart.
async fn open_session(state: &AppState, pssh: &str) -> Result<Session> {
    let blob = decode_base64("pssh", pssh)?;
    let device = state.config.load_device().await?;
    Ok(Session::new(device, &blob)?)
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value.as_bytes())
        .map_err(|e| GatewayError::Decode {
            field,
            reason: e.to_string(),
        })
}
