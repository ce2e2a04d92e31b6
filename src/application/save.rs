//! Trailing-edge debounce for persistence writes

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Forest;

/// What the persistence indicator shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PersistenceStatus {
    Idle,
    Pending,
    Saved { at: DateTime<Utc> },
    Failed { message: String },
}

/// Holds at most one pending snapshot.
///
/// Each `schedule` replaces the snapshot and pushes the deadline to
/// `now + quiet`, so a burst of mutations produces one write of the last state.
#[derive(Debug)]
pub struct SaveScheduler {
    quiet: Duration,
    pending: Option<(Instant, Forest)>,
}

impl SaveScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn schedule(&mut self, forest: Forest, now: Instant) {
        self.pending = Some((now + self.quiet, forest));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending snapshot, if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Forest> {
        match &self.pending {
            Some((due, _)) if *due <= now => self.pending.take().map(|(_, f)| f),
            _ => None,
        }
    }

    /// The pending snapshot regardless of deadline.
    pub fn take_pending(&mut self) -> Option<Forest> {
        self.pending.take().map(|(_, f)| f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Node;

    fn forest(name: &str) -> Forest {
        Forest::new(vec![Node::new("x", name, "red")])
    }

    #[test]
    fn given_burst_when_quiet_window_elapses_then_only_last_snapshot_is_due() {
        let t0 = Instant::now();
        let mut saves = SaveScheduler::new(Duration::from_millis(800));
        saves.schedule(forest("one"), t0);
        saves.schedule(forest("two"), t0 + Duration::from_millis(500));

        // First deadline would have been t0+800; it was pushed out
        assert!(saves.take_due(t0 + Duration::from_millis(900)).is_none());

        let due = saves.take_due(t0 + Duration::from_millis(1300)).unwrap();
        assert_eq!(due, forest("two"));
        assert!(!saves.is_pending());
    }

    #[test]
    fn given_pending_when_take_pending_then_returned_before_deadline() {
        let t0 = Instant::now();
        let mut saves = SaveScheduler::new(Duration::from_secs(60));
        saves.schedule(forest("one"), t0);
        assert!(saves.take_due(t0 + Duration::from_secs(59)).is_none());
        assert_eq!(saves.take_pending(), Some(forest("one")));
        assert_eq!(saves.take_pending(), None);
    }

    #[test]
    fn given_status_when_serialized_then_tagged() {
        let json = serde_json::to_string(&PersistenceStatus::Failed {
            message: "disk full".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"failed","message":"disk full"}"#);
    }
}
