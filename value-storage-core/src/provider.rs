use indexmap::IndexMap;

use crate::value::Value;

/// Error type raised by collaborators while a deferred value resolves.
///
/// The storage never wraps or inspects these; they reach the caller of
/// `get_value` exactly as the collaborator produced them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A zero-argument computation producing a value on every resolving read.
///
/// Results are never cached: each `get_value` invokes the computation again.
pub trait Computation: Send + Sync + 'static {
    fn compute(&self) -> Result<Value, BoxError>;
}

impl<F> Computation for F
where
    F: Fn() -> Result<Value, BoxError> + Send + Sync + 'static,
{
    fn compute(&self) -> Result<Value, BoxError> {
        self()
    }
}

/// An object wrapping exactly one value behind an accessor.
///
/// Resolution unwraps it by calling [`SingleValue::value`] once.
pub trait SingleValue: Send + Sync + 'static {
    fn value(&self) -> Result<Value, BoxError>;
}

/// A bundle of key/value pairs that is flattened into the storage when added.
///
/// Providers are never stored as entries themselves. Pairs whose value is
/// another provider are flattened recursively.
pub trait MultiValue: Send + Sync + 'static {
    fn values(&self) -> IndexMap<String, Value>;
}

impl MultiValue for IndexMap<String, Value> {
    fn values(&self) -> IndexMap<String, Value> {
        self.clone()
    }
}
