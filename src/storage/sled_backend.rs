use std::path::Path;

use super::{BackendQueue, SledMode, StorageError};

const SPOOL_TREE: &[u8] = b"v1:spool";

/// Spool log kept in a dedicated sled tree.
///
/// Keys are big-endian sequence numbers from `Db::generate_id`, which is
/// monotonic, so tree order is append order.
pub struct SledBackendQueue {
    db: sled::Db,
    spool: sled::Tree,
}

impl SledBackendQueue {
    pub fn open(
        data_path: &Path,
        cache_capacity: Option<u64>,
        mode: Option<SledMode>,
    ) -> Result<Self, StorageError> {
        let mut config = sled::Config::new().path(data_path);

        if let Some(cache_capacity) = cache_capacity {
            config = config.cache_capacity(cache_capacity);
        }
        if let Some(mode) = mode {
            config = config.mode(mode.into());
        }

        let db = config.open()?;
        let spool = db.open_tree(SPOOL_TREE)?;
        Ok(Self { db, spool })
    }
}

impl BackendQueue for SledBackendQueue {
    fn put(&self, data: &[u8]) -> Result<(), StorageError> {
        let sequence = self.db.generate_id()?;
        self.spool.insert(sequence.to_be_bytes(), data)?;
        Ok(())
    }

    fn depth(&self) -> Result<u64, StorageError> {
        Ok(self.spool.len() as u64)
    }

    fn read_all(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        let mut records = Vec::with_capacity(self.spool.len());
        for entry in self.spool.iter() {
            let (_, value) = entry?;
            records.push(value.to_vec());
        }
        Ok(records)
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.spool.flush()?;
        Ok(())
    }
}
