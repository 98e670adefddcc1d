//! This is a library for keeping small snapshots of app data on the user's device.
//! It was created for the daily drill, so it doesn't include much that was not needed for that project.
//!
//! Storage strategy:
//! 1. Every value lives under a logical key, and a write replaces the whole value.
//! 2. Values are wrapped in an "envelope" (magic bytes, format version, checksum) before they hit
//!    the disk, so a torn or foreign file is detected instead of being parsed as garbage.
//! 3. Backends only move bytes around. Anything that knows about TTLs or schemas lives above them.
//!
//! The browser backend is the Origin Private File System (behind the `opfs` feature). There is also
//! an in-memory backend, which is what you get when OPFS is unavailable (e.g. some private browsing
//! modes) and what the tests use.

pub mod envelope;
pub mod error;
pub mod memory;
pub mod scope;

#[cfg(feature = "opfs")]
pub mod opfs;

pub use error::StorageError;
pub use memory::MemoryBackend;

/// Byte-level storage of whole values under logical keys.
///
/// Implementations must commit a `write` completely or not at all: after a failed write the
/// previous value (if any) is still readable.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Seal `value` as JSON and store it under `key`.
pub async fn put_json<B, T>(backend: &B, key: &str, value: &T) -> Result<(), StorageError>
where
    B: StorageBackend + ?Sized,
    T: serde::Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value)?;
    backend.write(key, envelope::seal(&payload)).await
}

/// Read the JSON stored under `key` without committing to a concrete type, so callers can
/// migrate older shapes before deserializing.
pub async fn get_json_value<B>(
    backend: &B,
    key: &str,
) -> Result<Option<serde_json::Value>, StorageError>
where
    B: StorageBackend + ?Sized,
{
    let Some(bytes) = backend.read(key).await? else {
        return Ok(None);
    };
    let payload = envelope::open(&bytes)?;
    let value = serde_json::from_slice(payload)
        .map_err(|e| StorageError::Corrupt(format!("payload under {key} is not JSON: {e}")))?;
    Ok(Some(value))
}

/// A backend chosen at runtime.
#[derive(Debug, Clone)]
pub enum AnyBackend {
    #[cfg(feature = "opfs")]
    Opfs(crate::opfs::OpfsBackend),
    Memory(MemoryBackend),
}

impl StorageBackend for AnyBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self {
            #[cfg(feature = "opfs")]
            AnyBackend::Opfs(backend) => backend.read(key).await,
            AnyBackend::Memory(backend) => backend.read(key).await,
        }
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        match self {
            #[cfg(feature = "opfs")]
            AnyBackend::Opfs(backend) => backend.write(key, bytes).await,
            AnyBackend::Memory(backend) => backend.write(key, bytes).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            #[cfg(feature = "opfs")]
            AnyBackend::Opfs(backend) => backend.remove(key).await,
            AnyBackend::Memory(backend) => backend.remove(key).await,
        }
    }
}

impl AnyBackend {
    /// Open the OPFS directory `directory_name`, falling back to memory if the browser refuses.
    #[cfg(feature = "opfs")]
    pub async fn open_or_memory(directory_name: &str) -> Self {
        match crate::opfs::OpfsBackend::open(directory_name).await {
            Ok(backend) => AnyBackend::Opfs(backend),
            Err(e) => {
                log::warn!("OPFS unavailable ({e}), keeping the cache in memory for this tab");
                AnyBackend::Memory(MemoryBackend::default())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "opfs")]
            AnyBackend::Opfs(_) => "opfs",
            AnyBackend::Memory(_) => "memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Note {
        title: String,
        stars: u8,
    }

    #[test]
    fn test_json_round_trip_through_envelope() {
        let backend = MemoryBackend::default();
        let note = Note {
            title: "particles".to_string(),
            stars: 3,
        };

        block_on(put_json(&backend, "note", &note)).unwrap();
        let value = block_on(get_json_value(&backend, "note")).unwrap().unwrap();
        let back: Note = serde_json::from_value(value).unwrap();

        assert_eq!(back, note);
        let raw = backend.raw("note").unwrap();
        assert!(
            raw.starts_with(envelope::MAGIC),
            "Stored bytes should be sealed in an envelope"
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let backend = MemoryBackend::default();
        assert!(block_on(get_json_value(&backend, "nothing")).unwrap().is_none());
    }

    #[test]
    fn test_non_json_payload_is_corrupt() {
        let backend = MemoryBackend::default();
        backend.insert_raw("note", envelope::seal(b"{not json"));

        let err = block_on(get_json_value(&backend, "note")).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)), "got {err:?}");
    }

    #[test]
    fn test_any_backend_delegates_to_memory() {
        let backend = AnyBackend::Memory(MemoryBackend::default());
        assert_eq!(backend.kind(), "memory");

        block_on(backend.write("k", vec![1, 2, 3])).unwrap();
        assert_eq!(block_on(backend.read("k")).unwrap(), Some(vec![1, 2, 3]));
        block_on(backend.remove("k")).unwrap();
        block_on(backend.remove("k")).unwrap();
        assert_eq!(block_on(backend.read("k")).unwrap(), None);
    }
}
