use super::StorageError;

/// Append-only, ordered log that receives encoded envelopes.
///
/// `put` either stores the whole record or fails; callers never see a partially
/// appended record on replay.
pub trait BackendQueue: Send + Sync {
    fn put(&self, data: &[u8]) -> Result<(), StorageError>;
    /// Records currently held by the log.
    fn depth(&self) -> Result<u64, StorageError>;
    /// Every stored record, in append order.
    fn read_all(&self) -> Result<Vec<Vec<u8>>, StorageError>;
    fn flush(&self) -> Result<(), StorageError>;
}
