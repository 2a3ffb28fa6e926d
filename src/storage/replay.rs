use std::collections::BTreeMap;

use serde_json::json;

use crate::logging::{LogLevel, Logger};
use crate::message::Message;
use crate::wire::codec::decode;
use crate::wire::envelope::{detect_layout, EnvelopeLayout};

use super::{BackendQueue, StorageError};

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub messages: Vec<Message>,
    pub layouts: BTreeMap<EnvelopeLayout, u64>,
    pub rejected: u64,
}

/// Decodes every stored record in append order.
///
/// Undersized records are logged and skipped; they are never handed to the
/// scheduler. Backend read failures abort the replay.
pub fn replay(backend: &dyn BackendQueue, logger: &Logger) -> Result<ReplaySummary, StorageError> {
    let mut summary = ReplaySummary::default();

    for (offset, record) in backend.read_all()?.into_iter().enumerate() {
        match decode(&record) {
            Ok(message) => {
                if let Some(layout) = detect_layout(&record) {
                    *summary.layouts.entry(layout).or_default() += 1;
                }
                summary.messages.push(message);
            }
            Err(error) => {
                summary.rejected += 1;
                logger.log(
                    LogLevel::Warn,
                    "storage::replay",
                    &format!("skipping unreadable spool record: {error}"),
                    Some(json!({ "offset": offset, "size": record.len() })),
                );
            }
        }
    }

    logger.log(
        LogLevel::Info,
        "storage::replay",
        "Spool replay finished",
        Some(json!({
            "decoded": summary.messages.len(),
            "rejected": summary.rejected,
            "layouts": summary
                .layouts
                .iter()
                .map(|(layout, count)| (layout.as_str(), *count))
                .collect::<BTreeMap<_, _>>(),
        })),
    );

    Ok(summary)
}
