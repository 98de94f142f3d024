use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long finished entries stay visible before dropping back to idle.
const TERMINAL_HOLD: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Loading,
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub account_id: String,
    pub status: SyncStatus,
    pub message: String,
}

struct Entry {
    status: SyncStatus,
    message: String,
    completed_at: Option<Instant>,
}

/// Per-ad-account sync progress, shared across requests via `web::Data`.
/// An absent account is idle. Success/error entries expire after a short
/// hold so the dashboard indicator clears itself. Nothing here locks out
/// overlapping syncs of the same account; the idempotent upserts are the
/// only guard.
pub struct SyncProgressTracker {
    entries: Mutex<HashMap<String, Entry>>,
    hold: Duration,
}

impl SyncProgressTracker {
    pub fn new() -> Self {
        Self::with_hold(TERMINAL_HOLD)
    }

    pub fn with_hold(hold: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hold,
        }
    }

    pub fn set_loading(&self, account_id: &str, message: &str) {
        self.set(account_id, SyncStatus::Loading, message, None);
    }

    pub fn set_success(&self, account_id: &str, message: &str) {
        self.set(account_id, SyncStatus::Success, message, Some(Instant::now()));
    }

    pub fn set_error(&self, account_id: &str, message: &str) {
        self.set(account_id, SyncStatus::Error, message, Some(Instant::now()));
    }

    pub fn is_syncing(&self, account_id: &str) -> bool {
        let entries = self.entries.lock().expect("sync progress lock poisoned");
        matches!(
            entries.get(account_id),
            Some(entry) if entry.status == SyncStatus::Loading
        )
    }

    /// Current entries, with expired terminal entries purged.
    pub fn snapshot(&self) -> Vec<SyncProgress> {
        let mut entries = self.entries.lock().expect("sync progress lock poisoned");
        let hold = self.hold;
        entries.retain(|_, entry| match entry.completed_at {
            Some(done) => done.elapsed() < hold,
            None => true,
        });

        entries
            .iter()
            .map(|(account_id, entry)| SyncProgress {
                account_id: account_id.clone(),
                status: entry.status,
                message: entry.message.clone(),
            })
            .collect()
    }

    fn set(&self, account_id: &str, status: SyncStatus, message: &str, completed_at: Option<Instant>) {
        let mut entries = self.entries.lock().expect("sync progress lock poisoned");
        entries.insert(
            account_id.to_string(),
            Entry {
                status,
                message: message.to_string(),
                completed_at,
            },
        );
    }
}

impl Default for SyncProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_account_is_idle() {
        let tracker = SyncProgressTracker::new();
        assert!(!tracker.is_syncing("act_1"));
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_loading_then_success_transition() {
        let tracker = SyncProgressTracker::new();
        tracker.set_loading("act_1", "Fetching data");
        assert!(tracker.is_syncing("act_1"));

        tracker.set_success("act_1", "Synced");
        assert!(!tracker.is_syncing("act_1"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, SyncStatus::Success);
    }

    #[test]
    fn test_terminal_entries_expire_after_hold() {
        let tracker = SyncProgressTracker::with_hold(Duration::ZERO);
        tracker.set_error("act_1", "Graph API returned status 500");
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_loading_entries_never_expire() {
        let tracker = SyncProgressTracker::with_hold(Duration::ZERO);
        tracker.set_loading("act_1", "Fetching data");
        assert_eq!(tracker.snapshot().len(), 1);
    }

    #[test]
    fn test_entries_are_per_account() {
        let tracker = SyncProgressTracker::new();
        tracker.set_loading("act_1", "Fetching data");
        tracker.set_error("act_2", "boom");
        assert!(tracker.is_syncing("act_1"));
        assert!(!tracker.is_syncing("act_2"));
        assert_eq!(tracker.snapshot().len(), 2);
    }
}
