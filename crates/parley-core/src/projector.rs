//! Filter projection
//!
//! Pure functions from (log, registry, selection, filter flag, ordering policy) to the
//! exact sequence of messages a view should show. Nothing here holds state, so the same
//! inputs always produce the same output.

use std::collections::BTreeSet;

use crate::log::MessageLog;
use crate::message::Message;
use crate::ordering::OrderingPolicy;
use crate::registry::NameRegistry;

// ----------------------------------------------------------------------------
// Selection
// ----------------------------------------------------------------------------

/// Registry ranks the user currently has selected
///
/// A snapshot supplied by the UI and replaced wholesale whenever the selection changes.
/// Ranks may be stale (the participant was removed since); stale ranks simply never
/// match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<usize>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, rank: usize) -> bool {
        self.0.contains(&rank)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Selected ranks in ascending order
    pub fn ranks(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Whether `message` was written by a currently selected participant
    pub fn matches(&self, registry: &NameRegistry, message: &Message) -> bool {
        message
            .author()
            .and_then(|author| registry.index_of(author))
            .is_some_and(|rank| self.contains(rank))
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ----------------------------------------------------------------------------
// Projections
// ----------------------------------------------------------------------------

/// Messages to render, sorted under `policy`
///
/// With the filter off this is exactly [`MessageLog::snapshot_sorted`]. With it on, only
/// messages whose author is registered at a selected rank survive; authorless messages
/// are dropped.
pub fn project(
    log: &MessageLog,
    registry: &NameRegistry,
    selection: &Selection,
    filter_enabled: bool,
    policy: &OrderingPolicy,
) -> Vec<Message> {
    let sorted = log.snapshot_sorted(policy);
    if !filter_enabled {
        return sorted;
    }

    sorted
        .into_iter()
        .filter(|message| selection.matches(registry, message))
        .collect()
}

/// Whether `message` stays in the log when the selected participants are removed
///
/// Only messages with an author who is not selected survive, so authorless notices go
/// along with the selected participants' messages.
pub fn survives_removal(
    registry: &NameRegistry,
    selection: &Selection,
    message: &Message,
) -> bool {
    message.has_author() && !selection.matches(registry, message)
}

/// Log contents left after removing the selected participants' messages, in arrival order
pub fn remaining_after_removal(
    log: &MessageLog,
    registry: &NameRegistry,
    selection: &Selection,
) -> Vec<Message> {
    log.snapshot()
        .iter()
        .filter(|message| survives_removal(registry, selection, message))
        .cloned()
        .collect()
}
