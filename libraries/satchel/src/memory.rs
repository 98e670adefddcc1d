use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{StorageBackend, StorageError};

/// Keeps values in memory for the lifetime of the tab.
///
/// Clones share the same map, like two handles to the same directory. The `fail_*` switches make
/// the next operations of that kind fail with [`StorageError::Unavailable`], which is how tests
/// exercise the error paths of code built on top of a backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
    fail_reads: Rc<Cell<bool>>,
    fail_writes: Rc<Cell<bool>>,
    fail_removes: Rc<Cell<bool>>,
}

impl MemoryBackend {
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.set(fail);
    }

    /// Store bytes without sealing them.
    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.values.borrow_mut().insert(key.to_string(), bytes);
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.values.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads.get() {
            return Err(StorageError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Unavailable(format!("write of {key} refused")));
        }
        self.values.borrow_mut().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_removes.get() {
            return Err(StorageError::Unavailable(format!("remove of {key} refused")));
        }
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
