//! Message envelope codec and append-only spool for a disk-backed queue broker.

pub mod config;
pub mod logging;
pub mod message;
pub mod storage;
pub mod wire;
