use thiserror::Error;

/// Errors specific to the CDM protocol exchange.
#[derive(Debug, Clone, Error)]
pub enum CdmError {
    // ── Device credentials ────────────────────────────────────────────
    #[error("RSA key parse failed: {0}")]
    RsaKeyParse(String),
    #[error("client identification blob is empty")]
    ClientIdEmpty,

    // ── PSSH / init data ──────────────────────────────────────────────
    #[error("malformed PSSH box: {0}")]
    PsshMalformed(String),
    #[error("PSSH system ID does not match Widevine")]
    PsshSystemIdMismatch,
    #[error("init data is empty")]
    InitDataEmpty,

    // ── Protocol messages ─────────────────────────────────────────────
    #[error("protobuf decode failed: {0}")]
    ProtobufDecode(String),

    // ── Crypto ────────────────────────────────────────────────────────
    #[error("RSA operation failed: {0}")]
    RsaOperation(String),
    #[error("invalid AES-CBC input: {0}")]
    AesCbcInvalidInput(String),
    #[error("invalid PKCS#7 padding")]
    Pkcs7PaddingInvalid,
    #[error("HMAC-SHA256 signature mismatch")]
    HmacMismatch,

    // ── License exchange ──────────────────────────────────────────────
    #[error("no content keys in license response")]
    NoContentKeys,
}

impl From<prost::DecodeError> for CdmError {
    fn from(e: prost::DecodeError) -> Self {
        Self::ProtobufDecode(e.to_string())
    }
}

/// Type alias for results that may return a [`CdmError`].
pub type CdmResult<T> = std::result::Result<T, CdmError>;
