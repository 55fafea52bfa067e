/// Key type enumeration from `License.KeyContainer.KeyType`.
///
/// Protobuf default value 0 has no named variant in the proto
/// definition; containers carrying it are skipped during extraction.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    Signing = 1,
    Content = 2,
    KeyControl = 3,
    OperatorSession = 4,
    Entitlement = 5,
    OemContent = 6,
}

impl KeyType {
    pub const fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Signing),
            2 => Some(Self::Content),
            3 => Some(Self::KeyControl),
            4 => Some(Self::OperatorSession),
            5 => Some(Self::Entitlement),
            6 => Some(Self::OemContent),
            _ => None,
        }
    }
}

/// A decryption key extracted from a license response.
#[derive(Debug, Clone)]
pub struct ContentKey {
    /// Key ID, normalized to 16 bytes (UUID size).
    pub kid: [u8; 16],
    /// Decrypted key bytes. Typically 16 bytes for AES-128 content,
    /// but the protocol does not constrain key length.
    pub key: Vec<u8>,
    /// Key type from `KeyContainer.type`. All recognized types are
    /// extracted; callers filter to [`KeyType::Content`] for playback.
    pub key_type: KeyType,
}

impl ContentKey {
    /// True for keys usable to decrypt media content, as opposed to
    /// signing or management keys.
    pub fn is_content(&self) -> bool {
        self.key_type == KeyType::Content
    }
}
