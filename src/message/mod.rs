mod delivery;
mod routing;

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

pub use delivery::{DeliveryState, InFlightMessage};
pub use routing::{hash_routing_key, routing_hash_for};

pub const MSG_ID_LENGTH: usize = 16;
pub const SOURCE_CLIENT_ID_LEN: usize = 8;
/// Timestamp + attempts + id, the headerless layout written by the oldest brokers.
pub const MIN_LEGACY_MESSAGE_LEN: usize = 8 + 2 + MSG_ID_LENGTH;
/// Version byte + routing hash in front of the legacy header.
pub const MIN_EXTENDED_MESSAGE_LEN: usize = 1 + 4 + MIN_LEGACY_MESSAGE_LEN;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId([u8; MSG_ID_LENGTH]);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; MSG_ID_LENGTH] {
        &self.0
    }
}

impl From<[u8; MSG_ID_LENGTH]> for MessageId {
    fn from(raw: [u8; MSG_ID_LENGTH]) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Open set of envelope flags carried in the first byte of an extended record.
///
/// Flags are always tested individually. Bits this build does not know about are
/// kept as-is so a record written by a newer broker survives a decode/encode cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VersionFlags(u8);

impl VersionFlags {
    pub const EXTENDED_FORMAT: Self = Self(0x80);
    pub const HAS_SOURCE: Self = Self(0x01);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 != 0
    }

    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }
}

/// One unit of queued data as it travels through the envelope codec.
///
/// Identity fields are fixed at construction. `attempts` is the only field the
/// delivery scheduler may change, and the only mutable one that reaches the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    body: Vec<u8>,
    timestamp: i64,
    attempts: u16,
    version: VersionFlags,
    routing_hash: u32,
    source_client_id: Option<i64>,
}

impl Message {
    pub fn new(id: MessageId, body: impl Into<Vec<u8>>) -> Self {
        Self::with_routing(id, body, "", None)
    }

    pub fn with_routing(
        id: MessageId,
        body: impl Into<Vec<u8>>,
        routing_key: &str,
        source_client_id: Option<i64>,
    ) -> Self {
        let source_client_id = source_client_id.filter(|client_id| *client_id > 0);
        let mut version = VersionFlags::EXTENDED_FORMAT;
        if source_client_id.is_some() {
            version = version.with(VersionFlags::HAS_SOURCE);
        }

        Self {
            id,
            body: body.into(),
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            attempts: 0,
            version,
            routing_hash: routing_hash_for(routing_key),
            source_client_id,
        }
    }

    /// Rebuilds a message from already-validated envelope fields.
    pub(crate) fn from_envelope_fields(
        version: VersionFlags,
        routing_hash: u32,
        timestamp: i64,
        attempts: u16,
        id: MessageId,
        source_client_id: Option<i64>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            id,
            body,
            timestamp,
            attempts,
            version,
            routing_hash,
            source_client_id,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    pub fn set_attempts(&mut self, attempts: u16) {
        self.attempts = attempts;
    }

    pub fn increment_attempts(&mut self) -> u16 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn version(&self) -> VersionFlags {
        self.version
    }

    /// Zero for records recovered from the legacy layout; not usable for routing.
    pub fn routing_hash(&self) -> u32 {
        self.routing_hash
    }

    pub fn source_client_id(&self) -> Option<i64> {
        self.source_client_id
    }
}
