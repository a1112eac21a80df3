//! Message ordering policy
//!
//! The policy is the set of active sort criteria. Comparison walks the active criteria in
//! the fixed precedence DATE > CONTENT > AUTHOR and the first one that tells two messages
//! apart decides. With no criterion active every pair compares equal, so a stable sort
//! leaves arrival order untouched.
//!
//! One policy is shared by everything that renders a session. It is written rarely (a
//! menu choice) and read on every redisplay, so it is a single atomic word rather than a
//! lock: last writer wins and the change is visible to the next snapshot on any thread.
//! Nothing is notified when it changes; callers re-render explicitly.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

use crate::message::Message;

// ----------------------------------------------------------------------------
// Criteria
// ----------------------------------------------------------------------------

bitflags::bitflags! {
    /// Set of active sort criteria
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Criteria: u8 {
        const DATE = 0b001;
        const CONTENT = 0b010;
        const AUTHOR = 0b100;
    }
}

/// A single sort criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortCriterion {
    Date,
    Content,
    Author,
}

impl SortCriterion {
    /// All criteria in precedence order
    pub const PRECEDENCE: [SortCriterion; 3] = [
        SortCriterion::Date,
        SortCriterion::Content,
        SortCriterion::Author,
    ];

    pub fn flag(self) -> Criteria {
        match self {
            SortCriterion::Date => Criteria::DATE,
            SortCriterion::Content => Criteria::CONTENT,
            SortCriterion::Author => Criteria::AUTHOR,
        }
    }

    fn compare(self, a: &Message, b: &Message) -> Ordering {
        match self {
            SortCriterion::Date => a.timestamp().cmp(&b.timestamp()),
            SortCriterion::Content => a.content().cmp(b.content()),
            SortCriterion::Author => a.author().cmp(&b.author()),
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortCriterion::Date => write!(f, "date"),
            SortCriterion::Content => write!(f, "content"),
            SortCriterion::Author => write!(f, "author"),
        }
    }
}

impl FromStr for SortCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortCriterion::Date),
            "content" => Ok(SortCriterion::Content),
            "author" => Ok(SortCriterion::Author),
            other => Err(format!("unknown sort criterion: {other}")),
        }
    }
}

// ----------------------------------------------------------------------------
// Ordering Policy
// ----------------------------------------------------------------------------

/// Shared, mutable selection of active sort criteria
#[derive(Debug)]
pub struct OrderingPolicy {
    active: AtomicU8,
}

impl OrderingPolicy {
    /// Create a policy with the given criteria active
    pub fn new(active: Criteria) -> Self {
        Self {
            active: AtomicU8::new(active.bits()),
        }
    }

    /// Policy with only `criterion` active
    pub fn by(criterion: SortCriterion) -> Self {
        Self::new(criterion.flag())
    }

    /// Currently active criteria
    pub fn active(&self) -> Criteria {
        Criteria::from_bits_truncate(self.active.load(AtomicOrdering::Acquire))
    }

    pub fn is_active(&self, criterion: SortCriterion) -> bool {
        self.active().contains(criterion.flag())
    }

    /// Add a criterion without touching the others
    pub fn activate(&self, criterion: SortCriterion) {
        self.active
            .fetch_or(criterion.flag().bits(), AtomicOrdering::AcqRel);
    }

    /// Remove a criterion without touching the others
    pub fn deactivate(&self, criterion: SortCriterion) {
        self.active
            .fetch_and(!criterion.flag().bits(), AtomicOrdering::AcqRel);
    }

    /// Make `criterion` the only active criterion
    pub fn select_only(&self, criterion: SortCriterion) {
        self.active
            .store(criterion.flag().bits(), AtomicOrdering::Release);
    }

    /// Compare two messages under the current policy
    ///
    /// The active set is read once, so a concurrent policy change never mixes two
    /// policies within a single comparison.
    pub fn compare(&self, a: &Message, b: &Message) -> Ordering {
        compare_with(self.active(), a, b)
    }

    /// Stably sort `messages` under the current policy
    pub fn sort(&self, messages: &mut [Message]) {
        let active = self.active();
        messages.sort_by(|a, b| compare_with(active, a, b));
    }
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self::by(SortCriterion::Date)
    }
}

fn compare_with(active: Criteria, a: &Message, b: &Message) -> Ordering {
    SortCriterion::PRECEDENCE
        .iter()
        .filter(|criterion| active.contains(criterion.flag()))
        .map(|criterion| criterion.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
