//! Round-robin rotation over a growing set of keys (e.g. paymaster signers)

use ethers::signers::LocalWallet;
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Selects elements from a set one after another
pub trait Rotator<T>: Send + Sync {
    /// Returns the next element, or `None` if the set is empty
    fn next(&self) -> Option<T>;

    /// Appends an element to the set
    fn add(&self, item: T);

    /// Number of elements in the set
    fn count(&self) -> usize;
}

/// Thread-safe round-robin rotator
///
/// Clones share the same elements and cursor.
#[derive(Clone)]
pub struct RoundRobinRotator<T> {
    items: Arc<RwLock<Vec<T>>>,
    cursor: Arc<AtomicUsize>,
}

/// Rotator over the paymaster signers
pub type SignerRotator = RoundRobinRotator<LocalWallet>;

impl<T> Default for RoundRobinRotator<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> RoundRobinRotator<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items: Arc::new(RwLock::new(items)), cursor: Arc::new(AtomicUsize::new(0)) }
    }
}

impl<T> FromIterator<T> for RoundRobinRotator<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync> Rotator<T> for RoundRobinRotator<T> {
    fn next(&self) -> Option<T> {
        // the read lock keeps the length fixed while the cursor moves
        let items = self.items.read();
        if items.is_empty() {
            return None;
        }
        let len = items.len();
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| Some((cursor + 1) % len))
            .unwrap_or_else(|cursor| cursor);
        items.get(index % len).cloned()
    }

    fn add(&self, item: T) {
        self.items.write().push(item);
    }

    fn count(&self) -> usize {
        self.items.read().len()
    }
}

impl<T> fmt::Debug for RoundRobinRotator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundRobinRotator")
            .field("count", &self.items.read().len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}
