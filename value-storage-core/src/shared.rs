use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ValueError;
use crate::provider::{BoxError, MultiValue};
use crate::storage::{ValueStorage, extract, flatten_into, flatten_provider};
use crate::value::{FromValue, Value};

/// A [`ValueStorage`] guarded by a lock, shareable across threads.
///
/// All methods take `&self`. Collaborators never run under the lock: adds
/// flatten providers before taking the write lock, and resolving reads clone
/// the raw entry under the read lock and invoke it after releasing it. A
/// computation or provider may therefore read from the same storage.
///
/// Iteration works on [`snapshot`](Self::snapshot), taken at call time;
/// later writes are not reflected in it.
#[derive(Debug, Default)]
pub struct SharedValueStorage {
    inner: RwLock<ValueStorage>,
}

impl SharedValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Providers are flattened before the write lock is taken and only
    // collected entries are inserted under it, so a panicking collaborator
    // never poisons the lock with a half-applied add.
    fn read(&self) -> RwLockReadGuard<'_, ValueStorage> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ValueStorage> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_value(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        let mut entries = Vec::new();
        flatten_into(key.into(), value.into(), &mut entries);
        self.write().insert_flattened(entries);
        self
    }

    pub fn add_values(&self, provider: &dyn MultiValue) -> &Self {
        let mut entries = Vec::new();
        flatten_provider(provider, &mut entries);
        self.write().insert_flattened(entries);
        self
    }

    pub fn remove_value(&self, key: &str) {
        self.write().remove_value(key);
    }

    /// Returns a clone of the raw entry. Deferred values share identity
    /// with the stored entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Value>, BoxError> {
        match self.get(key) {
            Some(entry) => entry.resolve().map(Some),
            None => Ok(None),
        }
    }

    pub fn require(&self, key: &str) -> Result<Value, ValueError> {
        self.get_value(key)?
            .ok_or_else(|| ValueError::NotFound(key.to_string()))
    }

    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<Option<T>, ValueError> {
        match self.get_value(key)? {
            Some(value) => extract(key, value).map(Some),
            None => Ok(None),
        }
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.read().has_value(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.read().snapshot()
    }

    /// Resolves every entry of a snapshot taken at call time.
    pub fn resolve_all(&self) -> Result<indexmap::IndexMap<String, Value>, BoxError> {
        let snapshot = self.read().clone();
        snapshot.resolve_all()
    }

    pub fn into_inner(self) -> ValueStorage {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<ValueStorage> for SharedValueStorage {
    fn from(storage: ValueStorage) -> Self {
        SharedValueStorage {
            inner: RwLock::new(storage),
        }
    }
}
