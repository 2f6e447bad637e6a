//! # Health
//! A long-lived subscription must not tear itself down over one malformed node, so per-event decode failures are
//! dropped. To keep that from going unnoticed, every subscription keeps these counters. A subscription is
//! `stalled` once it can no longer deliver anything: the watched node stopped being a keyed collection, or the
//! transport ended the stream.

use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionHealth {
    /// Callback invocations so far.
    pub delivered: u64,
    /// Events dropped because they could not be decoded.
    pub dropped: u64,
    /// Dropped events since the last successful delivery.
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    /// If last_failure is Some, then at least one event failed. It is kept after the next success.
    pub last_failure: Option<String>,
    /// The initial snapshot has been delivered.
    pub synced: bool,
    pub stalled: bool,
    pub cancelled: bool,
}

impl SubscriptionHealth {
    pub(crate) fn record_success(&mut self) {
        self.delivered += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self, reason: String) {
        self.dropped += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(reason);
    }

    pub(crate) fn mark_stalled(&mut self, reason: String) {
        self.stalled = true;
        self.last_failure = Some(reason);
    }

    /// Live, not stalled, and the last event was not dropped.
    pub fn is_healthy(&self) -> bool {
        !self.cancelled && !self.stalled && self.consecutive_failures == 0
    }
}
