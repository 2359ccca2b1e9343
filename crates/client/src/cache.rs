//! Cache of counterfactual account addresses

use ethers::types::{Address, U256};
use lru::LruCache;
use parking_lot::Mutex;
use std::{fmt, num::NonZeroUsize};

/// Default number of cached addresses
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Owner and salt the account address is derived from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub owner: Address,
    pub salt: U256,
}

impl AccountKey {
    pub fn new(owner: Address, salt: U256) -> Self {
        Self { owner, salt }
    }
}

/// Thread-safe cache of account addresses
pub trait AddressCache: Send + Sync + fmt::Debug {
    fn get(&self, key: &AccountKey) -> Option<Address>;

    /// Stores the address and returns whether another entry was evicted to make room for it
    fn set(&self, key: AccountKey, address: Address) -> bool;
}

/// [AddressCache] evicting the least recently used address
pub struct LruAddressCache {
    inner: Mutex<LruCache<AccountKey, Address>>,
}

impl LruAddressCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for LruAddressCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for LruAddressCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruAddressCache")
            .field("len", &inner.len())
            .field("cap", &inner.cap())
            .finish()
    }
}

impl AddressCache for LruAddressCache {
    fn get(&self, key: &AccountKey) -> Option<Address> {
        self.inner.lock().get(key).copied()
    }

    fn set(&self, key: AccountKey, address: Address) -> bool {
        // `push` also returns the previous entry of an overwritten key
        matches!(self.inner.lock().push(key, address), Some((evicted, _)) if evicted != key)
    }
}
