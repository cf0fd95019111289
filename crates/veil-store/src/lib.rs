//! # veil-store — In-Memory Record Store
//!
//! Thread-safe, cloneable key-value store shared by the escrow and approval
//! engines. Clones share the same underlying map.
//!
//! All operations are synchronous. The lock is a `parking_lot::RwLock` and is
//! never held across an `.await`, so async callers can use the store directly.
//! `parking_lot` locks do not poison: a panicking writer leaves the map usable.
//!
//! ## Atomicity
//!
//! - [`Store::try_update`] runs read-validate-mutate for one record under a
//!   single write lock. This is the check-and-set primitive escrow transitions
//!   rely on.
//! - [`Store::transact`] stages changes to many records in a [`Txn`] and
//!   commits them only if the closure returns `Ok`. Concurrent readers never
//!   observe a partially applied batch.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

// -- Store --------------------------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
#[derive(Debug)]
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    /// Insert only if the key is free. Returns `false` (and drops `value`)
    /// when the key is already taken.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Check if a record exists.
    pub fn contains(&self, key: &K) -> bool {
        self.data.read().contains_key(key)
    }

    /// List all records in unspecified order.
    pub fn list(&self) -> Vec<V> {
        self.data.read().values().cloned().collect()
    }

    /// List the records matching `pred`, in unspecified order.
    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> Option<V> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(key)?;
        f(entry);
        Some(entry.clone())
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure sees the current record and either mutates it and returns
    /// `Ok(R)`, or returns `Err(E)`. On `Err` the stored record is left exactly
    /// as it was, even if the closure mutated its argument before failing.
    ///
    /// Returns `None` if the record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(key)?;
        let mut candidate = entry.clone();
        Some(f(&mut candidate).map(|r| {
            *entry = candidate;
            r
        }))
    }

    /// Run a multi-record transaction.
    ///
    /// The closure reads through and writes into a [`Txn`]. Writes are
    /// buffered and applied together only when the closure returns `Ok`.
    /// The write lock is held for the whole closure, so the transaction is
    /// serializable with respect to every other store operation.
    pub fn transact<R, E>(
        &self,
        f: impl FnOnce(&mut Txn<'_, K, V>) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut guard = self.data.write();
        let mut txn = Txn {
            base: &guard,
            staged: HashMap::new(),
        };
        let result = f(&mut txn)?;
        let staged = txn.staged;
        guard.extend(staged);
        Ok(result)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Transactions -------------------------------------------------------------

/// A staged view over the store used inside [`Store::transact`].
///
/// Reads see staged writes first, then committed data.
pub struct Txn<'a, K, V> {
    base: &'a HashMap<K, V>,
    staged: HashMap<K, V>,
}

impl<'a, K, V> Txn<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Read a record as the transaction currently sees it.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.staged.get(key).or_else(|| self.base.get(key))
    }

    /// All records as the transaction currently sees them.
    pub fn values(&self) -> Vec<&V> {
        let mut out: Vec<&V> = self.staged.values().collect();
        out.extend(
            self.base
                .iter()
                .filter(|(k, _)| !self.staged.contains_key(k))
                .map(|(_, v)| v),
        );
        out
    }

    /// Stage an insert or overwrite.
    pub fn put(&mut self, key: K, value: V) {
        self.staged.insert(key, value);
    }

    /// Stage a conditional update of one record.
    ///
    /// Same contract as [`Store::try_update`]: on `Err` nothing is staged.
    pub fn try_update<R, E>(
        &mut self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let mut candidate = self.get(key)?.clone();
        Some(f(&mut candidate).map(|r| {
            self.staged.insert(key.clone(), candidate);
            r
        }))
    }

    /// Number of records written so far.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A rolled-back transaction leaves the store byte-for-byte unchanged.
        #[test]
        fn aborted_transaction_changes_nothing(
            initial in prop::collection::hash_map(0u8..32, 0u32..100, 0..16),
            writes in prop::collection::vec((0u8..40, 0u32..100), 0..16),
        ) {
            let store: Store<u8, u32> = Store::new();
            for (k, v) in &initial {
                store.insert(*k, *v);
            }
            let _: Result<(), ()> = store.transact(|txn| {
                for (k, v) in &writes {
                    txn.put(*k, *v);
                }
                Err(())
            });
            prop_assert_eq!(store.len(), initial.len());
            for (k, v) in &initial {
                prop_assert_eq!(store.get(k), Some(*v));
            }
        }
    }
}
