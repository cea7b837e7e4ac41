use indexmap::IndexMap;

use crate::error::ValueError;
use crate::provider::{BoxError, MultiValue};
use crate::value::{FromValue, Value};

/// An ordered key/value container that resolves deferred values on read.
///
/// Entries keep their first-insertion position; overwriting a key replaces the
/// entry in place. Two read paths exist:
/// - [`get`](Self::get) returns the raw entry exactly as stored
/// - [`get_value`](Self::get_value) resolves computations and value objects
///
/// Resolution never mutates the stored entry, so every resolving read
/// invokes the collaborators again.
#[derive(Clone, Default)]
pub struct ValueStorage {
    values: IndexMap<String, Value>,
}

impl ValueStorage {
    /// Creates a new empty storage.
    pub fn new() -> Self {
        ValueStorage {
            values: IndexMap::new(),
        }
    }

    /// Creates a storage by adding every pair in order.
    ///
    /// Pairs go through [`add_value`](Self::add_value), so null values are
    /// skipped and providers are flattened.
    pub fn with_values<K, V, I>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut storage = Self::new();
        for (key, value) in values {
            storage.add_value(key, value);
        }
        storage
    }

    /// Adds a value under the given key.
    ///
    /// - `Null` is ignored and leaves any existing entry untouched.
    /// - A [`Value::Values`] provider is flattened: each of its pairs is added
    ///   under its own key and `key` is ignored.
    /// - Anything else is stored, replacing an existing entry in place.
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let mut entries = Vec::new();
        flatten_into(key.into(), value.into(), &mut entries);
        self.insert_flattened(entries);
        self
    }

    /// Alias of [`add_value`](Self::add_value).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.add_value(key, value)
    }

    /// Flattens every pair of a provider into the storage.
    pub fn add_values(&mut self, provider: &dyn MultiValue) -> &mut Self {
        let mut entries = Vec::new();
        flatten_provider(provider, &mut entries);
        self.insert_flattened(entries);
        self
    }

    /// Stores entries already produced by [`flatten_into`]; existing keys
    /// keep their position.
    pub(crate) fn insert_flattened(&mut self, entries: Vec<(String, Value)>) {
        self.values.extend(entries);
    }

    /// Removes the entry for `key`, if any.
    pub fn remove_value(&mut self, key: &str) {
        self.values.shift_remove(key);
    }

    /// Returns the raw entry without resolving it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the resolved value for `key`.
    ///
    /// `Ok(None)` means no entry exists. Errors raised by a computation or
    /// value object are returned unchanged.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>, BoxError> {
        match self.get(key) {
            Some(entry) => entry.resolve().map(Some),
            None => Ok(None),
        }
    }

    /// Returns the resolved value, treating a missing key as an error.
    pub fn require(&self, key: &str) -> Result<Value, ValueError> {
        self.get_value(key)?
            .ok_or_else(|| ValueError::NotFound(key.to_string()))
    }

    /// Returns the resolved value extracted as `T`.
    ///
    /// Extraction is exact; a value of a different kind is a
    /// [`ValueError::TypeMismatch`].
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<Option<T>, ValueError> {
        match self.get_value(key)? {
            Some(value) => extract(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Checks whether a raw entry exists, regardless of what it resolves to.
    pub fn has_value(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterates raw entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.values.keys()
    }

    /// Copies the raw entries in insertion order.
    ///
    /// Deferred values are shared, not invoked.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Resolves every entry, stopping at the first collaborator failure.
    pub fn resolve_all(&self) -> Result<IndexMap<String, Value>, BoxError> {
        self.values
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.resolve()?)))
            .collect()
    }
}

/// Collects the entries that adding `value` under `key` produces.
///
/// Nulls are skipped, providers are flattened recursively under their own
/// keys and values under an empty key are dropped. Collaborators run here,
/// before the storage is touched.
pub(crate) fn flatten_into(key: String, value: Value, entries: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {
            log::trace!("skipping null value for key {key:?}");
        }
        Value::Values(provider) => flatten_provider(provider.as_ref(), entries),
        value if key.is_empty() => {
            log::warn!("dropping {} value added under an empty key", value.kind());
        }
        value => entries.push((key, value)),
    }
}

pub(crate) fn flatten_provider(provider: &dyn MultiValue, entries: &mut Vec<(String, Value)>) {
    let values = provider.values();
    log::trace!("flattening provider with {} values", values.len());
    for (key, value) in values {
        flatten_into(key, value, entries);
    }
}

/// Extracts a resolved value as `T`, reporting a mismatch against `key`.
pub(crate) fn extract<T: FromValue>(key: &str, value: Value) -> Result<T, ValueError> {
    T::from_value(&value).ok_or_else(|| ValueError::TypeMismatch {
        key: key.to_string(),
        expected: T::KIND,
        found: value.kind(),
    })
}

impl std::fmt::Debug for ValueStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueStorage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_values(iter)
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for ValueStorage {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add_value(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a ValueStorage {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for ValueStorage {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SingleValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockValue(i64);

    impl SingleValue for MockValue {
        fn value(&self) -> Result<Value, BoxError> {
            Ok(Value::Int(self.0))
        }
    }

    fn pairs(values: &[(&str, i64)]) -> IndexMap<String, Value> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn empty_storage() {
        let storage = ValueStorage::new();
        assert_eq!(storage.len(), 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn add_and_overwrite() {
        let mut storage = ValueStorage::new();
        storage.add_value("k", 1).add_value("k", 2);

        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get_value("k").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn null_is_ignored() {
        let mut storage = ValueStorage::new();
        storage.add_value("k", Value::Null);
        assert!(!storage.has_value("k"));

        storage.add_value("k", 1).add_value("k", Value::Null);
        assert_eq!(storage.get("k"), Some(&Value::Int(1)));
    }

    #[test]
    fn empty_key_is_dropped() {
        let mut storage = ValueStorage::new();
        storage.add_value("", 1);
        assert!(storage.is_empty());
    }

    #[test]
    fn remove_value() {
        let mut storage = ValueStorage::new();
        storage.add_value("a", 1).add_value("b", 2);
        storage.remove_value("a");

        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("a"), None);
        assert_eq!(storage.get_value("b").unwrap(), Some(Value::Int(2)));

        storage.remove_value("missing");
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn remove_keeps_order_of_remaining() {
        let mut storage = ValueStorage::with_values(pairs(&[("a", 1), ("b", 2), ("c", 3)]));
        storage.remove_value("a");

        let keys: Vec<_> = storage.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn raw_get_preserves_identity() {
        let func = Value::computation(|| 22);
        let mut storage = ValueStorage::new();
        storage.add_value("test", func.clone());

        assert_eq!(storage.get("test"), Some(&func));
        assert_eq!(storage.get_value("test").unwrap(), Some(Value::Int(22)));
    }

    #[test]
    fn computation_runs_on_every_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut storage = ValueStorage::new();
        storage.add_value(
            "count",
            Value::computation(move || counter.fetch_add(1, Ordering::SeqCst) as i64),
        );

        assert_eq!(storage.get_value("count").unwrap(), Some(Value::Int(0)));
        assert_eq!(storage.get_value("count").unwrap(), Some(Value::Int(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        storage.get("count");
        storage.has_value("count");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn value_object_resolution() {
        let value = Value::object(MockValue(22));
        let mut storage = ValueStorage::new();
        storage.add_value("test", value.clone());

        assert_eq!(storage.get("test"), Some(&value));
        assert_eq!(storage.get_value("test").unwrap(), Some(Value::Int(22)));
    }

    #[test]
    fn get_value_missing_is_none() {
        let storage = ValueStorage::new();
        assert_eq!(storage.get_value("missing").unwrap(), None);
    }

    #[test]
    fn falsy_literals_are_returned_as_is() {
        let storage = ValueStorage::with_values([("zero", Value::Int(0)), ("empty", Value::from(""))]);

        assert_eq!(storage.get_value("zero").unwrap(), Some(Value::Int(0)));
        assert_eq!(storage.get_value("empty").unwrap(), Some(Value::from("")));
    }

    #[test]
    fn has_value_ignores_resolution() {
        let mut storage = ValueStorage::new();
        storage
            .add_value("zero", Value::computation(|| 0))
            .add_value("nothing", Value::computation(|| Value::Null));

        assert!(storage.has_value("zero"));
        assert!(storage.has_value("nothing"));
        assert_eq!(storage.get_value("nothing").unwrap(), Some(Value::Null));
    }

    #[test]
    fn provider_flattens_under_own_keys() {
        let mut storage = ValueStorage::new();
        storage.add_value("ignored", Value::provider(pairs(&[("test", 22), ("other-test", 88)])));

        assert_eq!(storage.len(), 2);
        assert!(!storage.has_value("ignored"));
        assert_eq!(storage.get_value("test").unwrap(), Some(Value::Int(22)));
        assert_eq!(storage.get_value("other-test").unwrap(), Some(Value::Int(88)));
    }

    #[test]
    fn nested_providers_flatten_fully() {
        let mut inner = pairs(&[("inner", 1)]);
        inner.insert("skipped".to_string(), Value::Null);
        let mut outer = pairs(&[("outer", 2)]);
        outer.insert("nested".to_string(), Value::provider(inner));

        let storage = ValueStorage::with_values([("root", Value::provider(outer))]);

        let keys: Vec<_> = storage.keys().map(String::as_str).collect();
        assert_eq!(keys, ["outer", "inner"]);
    }

    #[test]
    fn empty_provider_adds_nothing() {
        let mut storage = ValueStorage::new();
        storage.add_values(&IndexMap::<String, Value>::new());
        assert!(storage.is_empty());
    }

    #[test]
    fn map_literal_is_a_single_entry() {
        let mut storage = ValueStorage::new();
        storage.add_value("config", pairs(&[("a", 1), ("b", 2)]));

        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage.get("config").and_then(Value::as_map).map(IndexMap::len),
            Some(2)
        );
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut storage = ValueStorage::with_values(pairs(&[("a", 1), ("b", 2), ("c", 3)]));
        storage.add_value("a", 10).add_value("d", 4);

        let entries: Vec<_> = storage
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_i64()))
            .collect();
        assert_eq!(
            entries,
            [("a", Some(10)), ("b", Some(2)), ("c", Some(3)), ("d", Some(4))]
        );
    }

    #[test]
    fn collaborator_error_passes_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("sensor offline")]
        struct SensorError;

        let mut storage = ValueStorage::new();
        storage.add_value(
            "temperature",
            Value::try_computation(|| -> Result<f64, SensorError> { Err(SensorError) }),
        );

        let err = storage.get_value("temperature").unwrap_err();
        assert!(err.downcast_ref::<SensorError>().is_some());
        assert!(storage.has_value("temperature"));
    }

    #[test]
    fn require_and_get_as() {
        let storage = ValueStorage::with_values([
            ("port", Value::computation(|| 8080)),
            ("host", Value::from("localhost")),
        ]);

        assert_eq!(storage.require("port").unwrap(), Value::Int(8080));
        assert!(matches!(storage.require("missing"), Err(ValueError::NotFound(k)) if k == "missing"));

        assert_eq!(storage.get_as::<i64>("port").unwrap(), Some(8080));
        assert_eq!(storage.get_as::<String>("missing").unwrap(), None);
        assert!(matches!(
            storage.get_as::<i64>("host"),
            Err(ValueError::TypeMismatch { expected: "int", found: "string", .. })
        ));
    }

    #[test]
    fn resolve_all_in_order() {
        let storage = ValueStorage::with_values([
            ("a", Value::computation(|| 1)),
            ("b", Value::object(MockValue(2))),
            ("c", Value::Int(3)),
        ]);

        let resolved = storage.resolve_all().unwrap();
        assert_eq!(resolved, pairs(&[("a", 1), ("b", 2), ("c", 3)]));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut storage = ValueStorage::with_values(pairs(&[("a", 1)]));
        let snapshot = storage.snapshot();
        storage.add_value("b", 2).remove_value("a");

        assert_eq!(snapshot, vec![("a".to_string(), Value::Int(1))]);
    }

    #[test]
    fn extend_and_collect() {
        let mut storage: ValueStorage = [("a", 1), ("b", 2)].into_iter().collect();
        storage.extend([("c", Value::Null), ("d", Value::Int(4))]);

        assert_eq!(storage.len(), 3);
        assert!(!storage.has_value("c"));
    }

    #[test]
    fn clear_empties() {
        let mut storage = ValueStorage::with_values(pairs(&[("a", 1)]));
        storage.clear();
        assert!(storage.is_empty());
    }
}
