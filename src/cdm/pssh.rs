use crate::cdm::error::{CdmError, CdmResult};

/// Widevine DRM system identifier (EDEF8BA9-79D6-4ACE-A3C8-27DCD51D21ED).
const WIDEVINE_SYSTEM_ID: [u8; 16] = [
    0xED, 0xEF, 0x8B, 0xA9, 0x79, 0xD6, 0x4A, 0xCE, 0xA3, 0xC8, 0x27, 0xDC, 0xD5, 0x1D, 0x21, 0xED,
];

/// Extract license-request init data from a decoded PSSH blob.
///
/// Clients send either a full ISOBMFF `pssh` box or bare init data;
/// box-shaped input is parsed (and its system id enforced), anything
/// else is passed through as-is.
pub fn init_data(blob: &[u8]) -> CdmResult<Vec<u8>> {
    if blob.is_empty() {
        return Err(CdmError::InitDataEmpty);
    }
    if looks_like_box(blob) {
        let parsed = PsshBox::from_bytes(blob)?;
        if parsed.data.is_empty() {
            return Err(CdmError::InitDataEmpty);
        }
        return Ok(parsed.data);
    }
    Ok(blob.to_vec())
}

fn looks_like_box(blob: &[u8]) -> bool {
    blob.len() >= 8 && &blob[4..8] == b"pssh"
}

/// Parsed ISOBMFF PSSH box.
///
/// Layout:
///   [0..4]    box_size: u32 big-endian (total box size)
///   [4..8]    box_type: "pssh"
///   [8]       version: u8 (0 or 1)
///   [9..12]   flags: u24 (typically zero)
///   [12..28]  system_id: 16 bytes
///   if version == 1:
///     [28..32]  key_id_count: u32 big-endian
///     [32..]    key_ids: key_id_count * 16 bytes
///   [..]      data_size: u32 big-endian
///   [..]      data: data_size bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    /// Key IDs from the box header (v1 only). Empty for v0 boxes.
    pub key_ids: Vec<[u8; 16]>,
    /// Raw init data payload (for Widevine, a WidevinePsshData protobuf).
    pub data: Vec<u8>,
}

impl PsshBox {
    /// Parse a PSSH box from raw bytes starting at `box_size`.
    pub fn from_bytes(input: &[u8]) -> CdmResult<Self> {
        // Minimum: 4 (size) + 4 (type) + 1 (ver) + 3 (flags) + 16 (sysid) + 4 (data_size) = 32
        if input.len() < 32 {
            return Err(pssh_err("input too short for PSSH box header"));
        }

        let box_size = read_u32_be(input, 0) as usize;
        if box_size > input.len() {
            return Err(pssh_err("box_size exceeds input length"));
        }

        let box_data = &input[..box_size];
        if &box_data[4..8] != b"pssh" {
            return Err(pssh_err("box_type is not 'pssh'"));
        }

        let version = box_data[8];
        if version > 1 {
            return Err(pssh_err(&format!("unsupported version {version}")));
        }

        if box_data[12..28] != WIDEVINE_SYSTEM_ID {
            return Err(CdmError::PsshSystemIdMismatch);
        }

        let mut offset = 28;
        let mut key_ids = Vec::new();

        if version == 1 {
            check_bounds(box_data, offset, 4, "key_id_count")?;
            let kid_count = read_u32_be(box_data, offset) as usize;
            offset += 4;

            check_bounds(box_data, offset, kid_count * 16, "key_ids")?;
            for chunk in box_data[offset..offset + kid_count * 16].chunks_exact(16) {
                let mut kid = [0u8; 16];
                kid.copy_from_slice(chunk);
                key_ids.push(kid);
            }
            offset += kid_count * 16;
        }

        check_bounds(box_data, offset, 4, "data_size")?;
        let data_size = read_u32_be(box_data, offset) as usize;
        offset += 4;

        check_bounds(box_data, offset, data_size, "data")?;
        let data = box_data[offset..offset + data_size].to_vec();

        Ok(PsshBox {
            version,
            key_ids,
            data,
        })
    }
}

fn read_u32_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn check_bounds(data: &[u8], offset: usize, need: usize, field: &str) -> CdmResult<()> {
    if offset + need > data.len() {
        Err(pssh_err(&format!("truncated {field}")))
    } else {
        Ok(())
    }
}

fn pssh_err(msg: &str) -> CdmError {
    CdmError::PsshMalformed(msg.into())
}

#[cfg(test)]
pub(crate) fn build_v0_box(data: &[u8]) -> Vec<u8> {
    let size = 32 + data.len();
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&(size as u32).to_be_bytes());
    buf.extend_from_slice(b"pssh");
    buf.extend_from_slice(&[0, 0, 0, 0]); // version 0, zero flags
    buf.extend_from_slice(&WIDEVINE_SYSTEM_ID);
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_v1_box(key_ids: &[[u8; 16]], data: &[u8]) -> Vec<u8> {
        let size = 32 + 4 + key_ids.len() * 16 + data.len();
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&(size as u32).to_be_bytes());
        buf.extend_from_slice(b"pssh");
        buf.extend_from_slice(&[1, 0, 0, 0]); // version 1, zero flags
        buf.extend_from_slice(&WIDEVINE_SYSTEM_ID);
        buf.extend_from_slice(&(key_ids.len() as u32).to_be_bytes());
        for kid in key_ids {
            buf.extend_from_slice(kid);
        }
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn parses_v0_box() {
        let blob = build_v0_box(b"payload");
        let parsed = PsshBox::from_bytes(&blob).unwrap();
        assert_eq!(parsed.version, 0);
        assert!(parsed.key_ids.is_empty());
        assert_eq!(parsed.data, b"payload");
    }

    #[test]
    fn parses_v1_box_with_key_ids() {
        let kids = [[0xABu8; 16], [0xCDu8; 16]];
        let blob = build_v1_box(&kids, b"d");
        let parsed = PsshBox::from_bytes(&blob).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.key_ids, kids.to_vec());
        assert_eq!(parsed.data, b"d");
    }

    #[test]
    fn rejects_foreign_system_id() {
        let mut blob = build_v0_box(b"payload");
        blob[12] ^= 0xFF;
        let err = PsshBox::from_bytes(&blob).unwrap_err();
        assert!(matches!(err, CdmError::PsshSystemIdMismatch));
    }

    #[test]
    fn rejects_truncated_box() {
        let mut blob = build_v0_box(b"payload");
        let inflated_len = blob.len() as u32 + 8;
        blob[0..4].copy_from_slice(&inflated_len.to_be_bytes());
        assert!(PsshBox::from_bytes(&blob).is_err());
    }

    #[test]
    fn init_data_accepts_raw_blob() {
        let data = init_data(b"raw widevine init data").unwrap();
        assert_eq!(data, b"raw widevine init data");
    }

    #[test]
    fn init_data_unwraps_box() {
        let blob = build_v0_box(b"inner");
        assert_eq!(init_data(&blob).unwrap(), b"inner");
    }

    #[test]
    fn init_data_rejects_empty_input() {
        assert!(matches!(
            init_data(&[]).unwrap_err(),
            CdmError::InitDataEmpty
        ));
        let empty_box = build_v0_box(b"");
        assert!(matches!(
            init_data(&empty_box).unwrap_err(),
            CdmError::InitDataEmpty
        ));
    }
}
