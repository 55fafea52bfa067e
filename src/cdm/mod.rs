//! In-process Widevine CDM: challenge generation and license-response
//! key extraction for a provisioned device.

mod crypto;
mod device;
mod error;
mod proto;
mod pssh;
mod session;
mod types;

#[cfg(test)]
pub(crate) mod license_server;

pub use device::Device;
pub use error::{CdmError, CdmResult};
pub use session::Session;
pub use types::{ContentKey, KeyType};
