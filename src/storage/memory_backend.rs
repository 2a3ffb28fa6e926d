use std::sync::{Mutex, MutexGuard};

use super::{BackendQueue, StorageError};

#[derive(Default)]
pub struct MemoryBackendQueue {
    records: Mutex<Vec<Vec<u8>>>,
}

impl MemoryBackendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Vec<Vec<u8>>>, StorageError> {
        self.records.lock().map_err(|_| StorageError::Rejected {
            reason: "memory spool lock poisoned".to_owned(),
        })
    }
}

impl BackendQueue for MemoryBackendQueue {
    fn put(&self, data: &[u8]) -> Result<(), StorageError> {
        self.records()?.push(data.to_vec());
        Ok(())
    }

    fn depth(&self) -> Result<u64, StorageError> {
        Ok(self.records()?.len() as u64)
    }

    fn read_all(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(self.records()?.clone())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
