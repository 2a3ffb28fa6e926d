use thiserror::Error;

use crate::message::Message;
use crate::wire::codec::{encode_with_format, EncodeError};
use crate::wire::envelope::EnvelopeFormat;

use super::{BackendQueue, StorageError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode message envelope: {0}")]
    Encode(#[from] EncodeError),
    /// The backend's own error, untouched.
    #[error(transparent)]
    Backend(#[from] StorageError),
}

/// Encodes `message` into the reusable `buffer` and appends the bytes to `backend`.
///
/// The buffer is cleared first and holds the last encoded record afterwards; it
/// must not be read past the next call. Nothing reaches the backend if encoding
/// fails.
pub fn write_message_to_backend(
    buffer: &mut Vec<u8>,
    message: &Message,
    backend: &dyn BackendQueue,
    format: EnvelopeFormat,
) -> Result<(), PersistError> {
    buffer.clear();
    encode_with_format(message, format, buffer)?;
    backend.put(buffer)?;
    Ok(())
}
