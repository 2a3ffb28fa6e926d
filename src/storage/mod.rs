mod backend;
mod engine;
mod error;
mod facade;
mod memory_backend;
mod path;
mod replay;
mod sled_backend;
mod writer;

pub use backend::BackendQueue;
pub use engine::{SledMode, StorageEngine};
pub use error::StorageError;
pub use facade::StorageFacade;
pub use memory_backend::MemoryBackendQueue;
use path::expand_home_path;
pub use replay::{replay, ReplaySummary};
pub use sled_backend::SledBackendQueue;
pub use writer::{write_message_to_backend, PersistError};
