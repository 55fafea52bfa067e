//! Passkey authentication layers for the two route groups.
//!
//! Every protected route expects the passkey in a `passkey` request
//! header. Unknown and revoked passkeys both collapse to the same 401
//! so callers cannot probe which passkeys exist.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{GatewayError, Result};
use crate::passkey::Tier;
use crate::server::AppState;
use crate::store::PasskeyRecord;

async fn lookup(state: &AppState, headers: &HeaderMap) -> Result<PasskeyRecord> {
    let passkey = headers
        .get("passkey")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::Auth)?;

    let record = match state.store.get_passkey(passkey.to_string()).await {
        Ok(record) => record,
        Err(GatewayError::NotFound(_)) => return Err(GatewayError::Auth),
        Err(e) => return Err(e),
    };

    if record.revoked {
        return Err(GatewayError::Auth);
    }
    Ok(record)
}

/// Gate for `/v1`: any active passkey passes.
pub async fn require_passkey(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    lookup(&state, request.headers()).await?;
    Ok(next.run(request).await)
}

/// Gate for `/su`: only active superuser passkeys pass.
pub async fn require_superuser(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let record = lookup(&state, request.headers()).await?;
    if record.tier != Tier::Superuser {
        return Err(GatewayError::Auth);
    }
    Ok(next.run(request).await)
}

