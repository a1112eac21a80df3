//! Arrival-ordered message log
//!
//! The log publishes its contents as an immutable `Arc<Vec<Message>>`. Readers load the
//! current snapshot without blocking and can never see a half-finished append; writers
//! build the next vector and swap it in whole. Sorting always happens on a private copy.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::message::Message;
use crate::ordering::OrderingPolicy;

// ----------------------------------------------------------------------------
// Message Log
// ----------------------------------------------------------------------------

/// Append-only, thread-safe log of received messages
#[derive(Debug)]
pub struct MessageLog {
    entries: ArcSwap<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add a message after every message already in the log
    pub fn append(&self, message: Message) {
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(message.clone());
            next
        });
    }

    /// Current contents in arrival order
    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        self.entries.load_full()
    }

    /// Stably sorted copy of the current contents
    ///
    /// Messages that compare equal under `policy` keep their arrival order.
    pub fn snapshot_sorted(&self, policy: &OrderingPolicy) -> Vec<Message> {
        let mut sorted = self.snapshot().as_ref().clone();
        policy.sort(&mut sorted);
        sorted
    }

    /// Keep only the messages for which `keep` returns `true`, preserving arrival order
    ///
    /// The filter runs against the latest published contents and is retried if an
    /// append lands first, so concurrent appends are never lost. `keep` may therefore run
    /// more than once per message. Returns how many messages were dropped.
    pub fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&Message) -> bool,
    {
        let mut kept = 0;
        let previous = self.entries.rcu(|current| {
            let next: Vec<Message> = current.iter().filter(|m| keep(*m)).cloned().collect();
            kept = next.len();
            next
        });
        let removed = previous.len().saturating_sub(kept);
        debug!(removed, kept, "Message log filtered");
        removed
    }

    /// Atomically replace the entire contents
    pub fn replace(&self, contents: Vec<Message>) {
        debug!(count = contents.len(), "Message log replaced");
        self.entries.store(Arc::new(contents));
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::SortCriterion;
    use crate::types::Timestamp;
    use std::thread;

    fn msg(author: &str, content: &str, ts: u64) -> Message {
        Message::new(author, content, Timestamp::new(ts))
    }

    #[test]
    fn test_append_preserves_arrival_order() {
        let log = MessageLog::new();
        log.append(msg("b", "second", 2));
        log.append(msg("a", "first", 1));
        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].content(), "second");
        assert_eq!(snapshot[1].content(), "first");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_snapshot_sorted_does_not_mutate() {
        let log = MessageLog::new();
        log.append(msg("b", "x", 2));
        log.append(msg("a", "y", 1));
        let policy = OrderingPolicy::by(SortCriterion::Date);

        let sorted = log.snapshot_sorted(&policy);
        assert_eq!(sorted[0].timestamp(), Timestamp::new(1));
        assert_eq!(log.snapshot()[0].timestamp(), Timestamp::new(2));
        assert_eq!(sorted, log.snapshot_sorted(&policy));
    }

    #[test]
    fn test_held_snapshot_survives_replace() {
        let log = MessageLog::new();
        log.append(msg("a", "x", 1));
        let held = log.snapshot();
        log.clear();
        assert_eq!(held.len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_retain_reports_dropped_count() {
        let log = MessageLog::new();
        log.append(msg("a", "1", 1));
        log.append(msg("b", "2", 2));
        log.append(msg("a", "3", 3));

        assert_eq!(log.retain(|m| m.author() != Some("a")), 2);
        assert_eq!(log.snapshot().as_slice(), &[msg("b", "2", 2)]);
        assert_eq!(log.retain(|_| true), 0);
    }

    #[test]
    fn test_retain_never_loses_concurrent_appends() {
        let log = Arc::new(MessageLog::new());
        let writer = {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..500 {
                    log.append(msg("keep", &i.to_string(), i));
                    log.append(msg("drop", &i.to_string(), i));
                }
            })
        };
        for _ in 0..500 {
            log.retain(|m| m.author() == Some("keep"));
        }
        writer.join().unwrap();
        log.retain(|m| m.author() == Some("keep"));

        let kept = log.snapshot();
        assert_eq!(kept.len(), 500);
        assert!(kept
            .iter()
            .enumerate()
            .all(|(i, m)| m.timestamp() == Timestamp::new(i as u64)));
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let log = Arc::new(MessageLog::new());
        let writer = {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..200 {
                    log.append(msg("w", &i.to_string(), i));
                }
            })
        };
        let policy = OrderingPolicy::default();
        for _ in 0..50 {
            let snapshot = log.snapshot_sorted(&policy);
            // every snapshot is a prefix of the final arrival order
            for (i, m) in snapshot.iter().enumerate() {
                assert_eq!(m.timestamp(), Timestamp::new(i as u64));
            }
        }
        writer.join().unwrap();
        assert_eq!(log.len(), 200);
    }
}
