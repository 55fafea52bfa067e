//! Passkey generation and the two access tiers.

use data_encoding::BASE32_NOPAD;
use rand::TryRngCore;

use crate::error::{GatewayError, Result};

/// Access tier attached to a passkey.
///
/// Standard passkeys can drive the license exchange; superuser passkeys
/// can additionally mint and revoke passkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Standard,
    Superuser,
}

impl Tier {
    /// Map the request flags to a tier. Either flag being nonzero
    /// requests superuser access.
    pub fn from_flags(su: i64, sudoer: i64) -> Self {
        if su != 0 || sudoer != 0 {
            Tier::Superuser
        } else {
            Tier::Standard
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Superuser => "superuser",
        }
    }

    /// Parse a stored tier string. Unrecognized values degrade to
    /// Standard rather than failing the lookup.
    pub fn parse(s: &str) -> Self {
        match s {
            "superuser" => Tier::Superuser,
            _ => Tier::Standard,
        }
    }
}

/// Generate a new passkey: 16 bytes from the OS RNG, rendered as
/// unpadded base32 (26 characters).
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| GatewayError::Crypto(format!("OS RNG failure: {e}")))?;
    Ok(BASE32_NOPAD.encode(&bytes))
}
