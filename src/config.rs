use std::path::PathBuf;

use crate::cdm::Device;
use crate::error::{GatewayError, Result};

/// Paths to the provisioned device credentials.
///
/// Credentials are read from disk on every license exchange rather than
/// cached at startup, so a re-provisioned device takes effect without a
/// restart.
#[derive(Debug, Clone)]
pub struct Config {
    pub private_key_path: PathBuf,
    pub client_id_path: PathBuf,
}

impl Config {
    /// Read both credential files and build a [`Device`] from them.
    pub async fn load_device(&self) -> Result<Device> {
        let private_key = read_credential(&self.private_key_path).await?;
        let client_id = read_credential(&self.client_id_path).await?;
        Ok(Device::from_parts(&private_key, client_id)?)
    }
}

async fn read_credential(path: &PathBuf) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| GatewayError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(GatewayError::Io {
            path: path.display().to_string(),
            reason: "file is empty".into(),
        });
    }
    Ok(bytes)
}
