use opfs::{
    DirectoryHandle as _, FileHandle as _, WritableFileStream as _,
    persistent::{self, DirectoryHandle},
};

use crate::{StorageBackend, StorageError};

const FILE_EXTENSION: &str = "satchel";

/// Stores each key as one file in a directory of the Origin Private File System.
#[derive(Debug, Clone)]
pub struct OpfsBackend {
    directory_handle: DirectoryHandle,
}

impl OpfsBackend {
    pub async fn open(directory_name: &str) -> Result<Self, StorageError> {
        let root = persistent::app_specific_dir()
            .await
            .inspect_err(|e| log::error!("Failed to get app specific directory: {e:?}"))
            .map_err(to_storage_error)?;
        let directory_handle = root
            .get_directory_handle_with_options(
                directory_name,
                &opfs::GetDirectoryHandleOptions { create: true },
            )
            .await
            .inspect_err(|e| log::error!("Failed to open directory {directory_name}: {e:?}"))
            .map_err(to_storage_error)?;
        Ok(Self { directory_handle })
    }

    fn file_name(key: &str) -> String {
        format!("{key}.{FILE_EXTENSION}")
    }
}

impl StorageBackend for OpfsBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        // Asking without `create` fails when the file does not exist yet.
        let Ok(file_handle) = self
            .directory_handle
            .get_file_handle_with_options(
                &Self::file_name(key),
                &opfs::GetFileHandleOptions { create: false },
            )
            .await
        else {
            return Ok(None);
        };

        let bytes = file_handle
            .read()
            .await
            .inspect_err(|e| log::error!("Failed to read {key} from OPFS: {e:?}"))
            .map_err(to_storage_error)?;
        Ok(Some(bytes))
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let mut file_handle = self
            .directory_handle
            .get_file_handle_with_options(
                &Self::file_name(key),
                &opfs::GetFileHandleOptions { create: true },
            )
            .await
            .map_err(to_storage_error)?;

        // The new contents only replace the old ones when the stream is closed.
        let mut writable = file_handle
            .create_writable_with_options(&opfs::CreateWritableOptions {
                keep_existing_data: false,
            })
            .await
            .map_err(to_storage_error)?;
        writable
            .write_at_cursor_pos(bytes)
            .await
            .inspect_err(|e| log::error!("Failed to write {key} to OPFS: {e:?}"))
            .map_err(to_storage_error)?;
        writable.close().await.map_err(to_storage_error)?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let file_name = Self::file_name(key);
        if self
            .directory_handle
            .get_file_handle_with_options(&file_name, &opfs::GetFileHandleOptions { create: false })
            .await
            .is_err()
        {
            return Ok(());
        }

        let mut directory_handle = self.directory_handle.clone();
        directory_handle
            .remove_entry(&file_name)
            .await
            .inspect_err(|e| log::error!("Failed to remove {key} from OPFS: {e:?}"))
            .map_err(to_storage_error)?;
        Ok(())
    }
}

fn to_storage_error(e: persistent::Error) -> StorageError {
    let message = format!("{e:?}");
    if message.contains("QuotaExceeded") {
        StorageError::QuotaExceeded
    } else {
        StorageError::Unavailable(message)
    }
}
