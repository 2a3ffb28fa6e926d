use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Message;

/// Scheduler-owned bookkeeping for a message that is out for delivery.
///
/// None of these fields are part of the envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryState {
    pub delivered_at: Option<DateTime<Utc>>,
    pub client_id: Option<i64>,
    /// Ordering key in nanoseconds since the epoch; lower fires first.
    pub priority: i64,
    /// Slot in the scheduler's heap, if the message currently sits in one.
    pub index: Option<usize>,
    pub deferred: Option<Duration>,
}

/// A message record paired with its delivery state under one identity.
#[derive(Clone, Debug)]
pub struct InFlightMessage {
    record: Message,
    state: DeliveryState,
}

impl InFlightMessage {
    pub fn new(record: Message) -> Self {
        Self {
            record,
            state: DeliveryState::default(),
        }
    }

    pub fn record(&self) -> &Message {
        &self.record
    }

    pub fn state(&self) -> &DeliveryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeliveryState {
        &mut self.state
    }

    pub fn start_delivery(&mut self, client_id: i64, timeout: Duration) {
        let now = Utc::now();
        self.record.increment_attempts();
        self.state.delivered_at = Some(now);
        self.state.client_id = Some(client_id);
        self.state.deferred = None;
        self.state.priority = deadline_nanos(now, timeout);
    }

    pub fn defer(&mut self, delay: Duration) {
        self.state.client_id = None;
        self.state.deferred = Some(delay);
        self.state.priority = deadline_nanos(Utc::now(), delay);
    }

    pub fn into_record(self) -> Message {
        self.record
    }
}

fn deadline_nanos(from: DateTime<Utc>, after: Duration) -> i64 {
    let base = from.timestamp_nanos_opt().unwrap_or_default();
    let after = i64::try_from(after.as_nanos()).unwrap_or(i64::MAX);
    base.saturating_add(after)
}
