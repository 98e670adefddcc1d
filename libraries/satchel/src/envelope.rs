//! On-disk framing for stored values.
//!
//! Layout (little endian):
//!
//! | bytes | field            |
//! |-------|------------------|
//! | 8     | magic `SATCHEL\0`|
//! | 4     | format version   |
//! | 8     | xxh3 of payload  |
//! | rest  | payload          |

use xxhash_rust::xxh3::xxh3_64;

use crate::StorageError;

pub const MAGIC: &[u8] = b"SATCHEL\0";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = MAGIC.len() + 4 + 8;

/// Header fields of a sealed value, as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub checksum: u64,
    pub payload_len: usize,
}

pub fn seal(payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&xxh3_64(payload).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Parse the header without verifying the payload.
pub fn read_header(bytes: &[u8]) -> Result<Header, StorageError> {
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::Corrupt(format!(
            "envelope too small ({} bytes)",
            bytes.len()
        )));
    }

    if !bytes.starts_with(MAGIC) {
        return Err(StorageError::Corrupt(
            "envelope magic bytes did not match".to_string(),
        ));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 4]);
    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&bytes[MAGIC.len() + 4..HEADER_LEN]);

    Ok(Header {
        version: u32::from_le_bytes(version),
        checksum: u64::from_le_bytes(checksum),
        payload_len: bytes.len() - HEADER_LEN,
    })
}

/// Verify a sealed value and return its payload.
pub fn open(bytes: &[u8]) -> Result<&[u8], StorageError> {
    let header = read_header(bytes)?;

    if header.version != FORMAT_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported envelope version {}",
            header.version
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    let actual = xxh3_64(payload);
    if actual != header.checksum {
        log::warn!(
            "Envelope checksum mismatch: header says {:016x}, payload hashes to {actual:016x}",
            header.checksum
        );
        return Err(StorageError::Corrupt("envelope checksum mismatch".to_string()));
    }

    Ok(payload)
}
