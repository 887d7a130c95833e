//! Device secrets, as read from the input file and as sent to the device.
//!
//! The input file is YAML with a single `devices` list, each entry holding the
//! `name`, `mac`, `key` and `blob` of one device:
//!
//! ```yaml
//! devices:
//!   - name: dev1
//!     mac: 8c2b8a29d314
//!     key: 2ba019f94b77d4fe20b39945a4974498
//!     blob: AAAA...==
//! ```
//!
//! The position of a device in the list is the slot it gets provisioned into.

pub mod codec;

use std::{convert::TryInto, fs, path::Path};

use log::debug;
use serde::Deserialize;

use crate::error::{DecodeError, Result};

/// Number of bytes of a MAC address.
pub const MAC_LEN: usize = 6;
/// Number of bytes of a device key.
pub const KEY_LEN: usize = 16;
/// Number of bytes of a device blob.
pub const BLOB_LEN: usize = 256;
/// Maximum number of bytes in a device name.
pub const NAME_MAX_LEN: usize = 15;

// =============================================================================
// Public Interface
// =============================================================================

/// One entry of the secrets file, with the binary fields still in their
/// textual (hex or base64) encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceSecret {
    pub name: String,
    pub mac: String,
    pub key: String,
    pub blob: String,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    devices: Vec<DeviceSecret>,
}

/// Parse the YAML content of a secrets file.
pub fn parse_secrets(content: &str) -> Result<Vec<DeviceSecret>> {
    let file: SecretsFile = serde_yaml::from_str(content)?;
    Ok(file.devices)
}

/// Read and parse the secrets file at `path`. Failures here are fatal since no
/// partial progress is possible without the input.
pub fn load_secrets<P: AsRef<Path>>(path: P) -> Result<Vec<DeviceSecret>> {
    let path = path.as_ref();
    debug!("Reading secrets from {}", path.display());
    let content = fs::read_to_string(path)?;
    let devices = parse_secrets(&content)?;
    debug!("{} device(s) found", devices.len());
    Ok(devices)
}

/// A device secret with every binary field decoded to its exact length.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub mac: [u8; MAC_LEN],
    pub key: [u8; KEY_LEN],
    pub blob: [u8; BLOB_LEN],
}
impl SecretRecord {
    /// Decode the `mac`, `key` and `blob` fields of `secret`, in that order.
    /// The first field that fails to decode is reported.
    pub fn decode(secret: &DeviceSecret) -> std::result::Result<Self, DecodeError> {
        let mac = codec::decode(&secret.mac, MAC_LEN, "mac")?;
        let key = codec::decode(&secret.key, KEY_LEN, "key")?;
        let blob = codec::decode(&secret.blob, BLOB_LEN, "blob")?;

        Ok(SecretRecord {
            name: secret.name.clone(),
            mac: to_array(mac, "mac")?,
            key: to_array(key, "key")?,
            blob: to_array(blob, "blob")?,
        })
    }

    /// CRC32 (IEEE) over `mac || key || blob`, the value the device reports
    /// for a slot holding this record.
    pub fn crc32(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.mac);
        hasher.update(&self.key);
        hasher.update(&self.blob);
        hasher.finalize()
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("mac", &hex::encode(self.mac))
            .finish()
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn to_array<const N: usize>(
    bytes: Vec<u8>,
    field: &'static str,
) -> std::result::Result<[u8; N], DecodeError> {
    let actual = bytes.len();
    bytes.try_into().map_err(|_| DecodeError::WrongLength {
        field,
        actual,
        expected: N,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
