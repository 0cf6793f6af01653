//! Keyed store with explicit creation.
//!
//! `SyncMap` wraps a `BTreeMap` and exposes only operations that either
//! leave the key set untouched or say plainly that they add or remove a key.
//! Lookups return `Option`, and [`SyncMap::require`] / [`SyncMap::require_mut`]
//! turn a missing key into an error naming it. Iteration follows key order,
//! so sweeps over every slot are deterministic.

use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

/// Error type for SyncMap operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncMapError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("key already present: {0}")]
    KeyExists(String),
}

/// A keyed store that never creates entries implicitly.
///
/// # Example
///
/// ```
/// use srcroute_orch_common::SyncMap;
///
/// let mut map: SyncMap<String, u32> = SyncMap::new();
/// assert!(map.get(&"s1".to_string()).is_none());
/// assert!(map.is_empty());
///
/// map.insert("s1".to_string(), 7);
/// assert_eq!(map.require(&"s1".to_string()).unwrap(), &7);
/// ```
#[derive(Debug, Clone)]
pub struct SyncMap<K, V> {
    inner: BTreeMap<K, V>,
}

impl<K, V> SyncMap<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the value for `key`. **Never creates an entry.**
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Returns the value for `key` mutably. **Never creates an entry.**
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    /// Inserts or replaces the value for `key`, returning the previous one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.inner.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }
}

impl<K, V> SyncMap<K, V>
where
    K: Ord + Display,
{
    /// Returns the value for `key` or [`SyncMapError::KeyNotFound`].
    pub fn require(&self, key: &K) -> Result<&V, SyncMapError> {
        self.inner
            .get(key)
            .ok_or_else(|| SyncMapError::KeyNotFound(key.to_string()))
    }

    /// Returns the value for `key` mutably or [`SyncMapError::KeyNotFound`].
    pub fn require_mut(&mut self, key: &K) -> Result<&mut V, SyncMapError> {
        match self.inner.get_mut(key) {
            Some(value) => Ok(value),
            None => Err(SyncMapError::KeyNotFound(key.to_string())),
        }
    }

    /// Inserts `value` only if `key` is absent.
    pub fn insert_new(&mut self, key: K, value: V) -> Result<(), SyncMapError> {
        if self.inner.contains_key(&key) {
            return Err(SyncMapError::KeyExists(key.to_string()));
        }
        self.inner.insert(key, value);
        Ok(())
    }
}

impl<K: Ord, V> Default for SyncMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SyncMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
