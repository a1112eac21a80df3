//! Participant Name Registry
//!
//! A thread-safe, lexicographically sorted set of unique participant names. A name's
//! *rank* is its position in that order, so ranks shift whenever a name is inserted or
//! removed ahead of it.
//!
//! Every structural change fires exactly one [`RegistryChange`] covering the whole
//! current extent, because a single insertion can move every rank. Listeners run
//! synchronously while the registry lock is held, which makes each mutation atomic with
//! its notification. Listeners must therefore be quick and must never call back into the
//! registry; anything slower should use [`NameRegistry::subscribe`] and drain the channel
//! on its own thread.

use std::collections::BTreeSet;
use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

// ----------------------------------------------------------------------------
// Change Notification
// ----------------------------------------------------------------------------

/// Notification that the registry contents changed
///
/// Rows `0..len` must be considered changed; rows `len..previous_len` no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryChange {
    /// Size before the mutation
    pub previous_len: usize,
    /// Size after the mutation
    pub len: usize,
}

impl RegistryChange {
    /// Ranks whose contents may have changed
    pub fn extent(&self) -> core::ops::Range<usize> {
        0..self.len
    }
}

type Listener = Box<dyn Fn(RegistryChange) + Send + Sync>;

// ----------------------------------------------------------------------------
// Name Registry
// ----------------------------------------------------------------------------

/// Sorted, deduplicated set of participant names with change notification
pub struct NameRegistry {
    names: Mutex<BTreeSet<String>>,
    listeners: RwLock<Vec<Listener>>,
}

impl NameRegistry {
    /// Create an empty registry with no listeners
    pub fn new() -> Self {
        Self {
            names: Mutex::new(BTreeSet::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty registry that reports every change to `listener`
    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(RegistryChange) + Send + Sync + 'static,
    {
        let registry = Self::new();
        registry.add_listener(listener);
        registry
    }

    /// Register a synchronous listener (see the module docs for its constraints)
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(RegistryChange) + Send + Sync + 'static,
    {
        self.listeners.write().push(Box::new(listener));
    }

    /// Receive changes through an unbounded channel instead of a callback
    ///
    /// Sending never blocks, so the receiver may do arbitrary work. Once the receiver is
    /// dropped further changes are discarded.
    pub fn subscribe(&self) -> Receiver<RegistryChange> {
        let (tx, rx): (Sender<RegistryChange>, Receiver<RegistryChange>) =
            crossbeam_channel::unbounded();
        self.add_listener(move |change| {
            let _ = tx.send(change);
        });
        rx
    }

    /// Insert a name
    ///
    /// Returns `false` without notifying if the name is empty or already present.
    pub fn add(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let mut names = self.names.lock();
        if names.contains(name) {
            return false;
        }

        let previous_len = names.len();
        names.insert(name.to_owned());
        debug!(name, size = names.len(), "Participant added");
        self.notify(RegistryChange {
            previous_len,
            len: names.len(),
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().contains(name)
    }

    /// Remove the name at `rank`
    ///
    /// Returns `false` if `rank` is out of bounds.
    pub fn remove_at(&self, rank: usize) -> bool {
        let mut names = self.names.lock();
        let Some(name) = names.iter().nth(rank).cloned() else {
            trace!(rank, size = names.len(), "Remove rank out of bounds");
            return false;
        };

        let previous_len = names.len();
        names.remove(&name);
        debug!(name = %name, rank, "Participant removed");
        self.notify(RegistryChange {
            previous_len,
            len: names.len(),
        });
        true
    }

    /// Remove every name, notifying once if anything was removed
    pub fn clear(&self) {
        let mut names = self.names.lock();
        if names.is_empty() {
            return;
        }

        let previous_len = names.len();
        names.clear();
        debug!(previous_len, "Participant registry cleared");
        self.notify(RegistryChange {
            previous_len,
            len: 0,
        });
    }

    pub fn size(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }

    /// Name at `rank` in sorted order
    pub fn element_at(&self, rank: usize) -> Option<String> {
        self.names.lock().iter().nth(rank).cloned()
    }

    /// Rank of `name`, or `None` if it is not registered
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.lock().iter().position(|n| n == name)
    }

    /// Snapshot of all names in rank order
    pub fn names(&self) -> Vec<String> {
        self.names.lock().iter().cloned().collect()
    }

    fn notify(&self, change: RegistryChange) {
        for listener in self.listeners.read().iter() {
            listener(change);
        }
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRegistry")
            .field("names", &self.names())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl fmt::Display for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}
