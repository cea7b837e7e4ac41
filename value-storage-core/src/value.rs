use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::provider::{BoxError, Computation, MultiValue, SingleValue};

/// A value held by a [`ValueStorage`](crate::ValueStorage).
///
/// Literal variants compare by value. Deferred variants (`Computation`,
/// `Object`) and providers (`Values`) compare by pointer identity, so a raw
/// read returns the very object that was stored.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Invoked on every resolving read.
    Computation(Arc<dyn Computation>),
    /// Unwrapped through its accessor on every resolving read.
    Object(Arc<dyn SingleValue>),
    /// Flattened into individual entries when added; never stored.
    Values(Arc<dyn MultiValue>),
}

impl Value {
    /// Wraps an infallible closure as a deferred computation.
    pub fn computation<F, T>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        Value::Computation(Arc::new(move || -> Result<Value, BoxError> { Ok(f().into()) }))
    }

    /// Wraps a fallible closure as a deferred computation.
    ///
    /// Errors are converted into [`BoxError`] and returned from `get_value`
    /// without further wrapping.
    pub fn try_computation<F, T, E>(f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: Into<Value>,
        E: Into<BoxError>,
    {
        Value::Computation(Arc::new(move || -> Result<Value, BoxError> {
            f().map(Into::into).map_err(Into::into)
        }))
    }

    pub fn object(object: impl SingleValue) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn provider(provider: impl MultiValue) -> Self {
        Value::Values(Arc::new(provider))
    }

    /// Resolves this value to its final form.
    ///
    /// A computation is invoked once, then a value object (either stored
    /// directly or returned by the computation) is unwrapped once. Nothing
    /// is unwrapped beyond these two stages.
    pub fn resolve(&self) -> Result<Value, BoxError> {
        let value = match self {
            Value::Computation(computation) => computation.compute()?,
            other => other.clone(),
        };

        match value {
            Value::Object(object) => object.value(),
            value => Ok(value),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if resolution would invoke a collaborator.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Computation(_) | Value::Object(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Value::Values(_))
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Computation(_) => "computation",
            Value::Object(_) => "object",
            Value::Values(_) => "values",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Computation(a), Value::Computation(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Values(a), Value::Values(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Computation(c) => write!(f, "Computation({:p})", Arc::as_ptr(c)),
            Value::Object(o) => write!(f, "Object({:p})", Arc::as_ptr(o)),
            Value::Values(v) => write!(f, "Values({:p})", Arc::as_ptr(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<V: Into<Value>> From<IndexMap<String, V>> for Value {
    fn from(map: IndexMap<String, V>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Exact extraction of a literal from a resolved [`Value`].
///
/// No coercion takes place: an `Int` never converts to `f64`, a `Str`
/// never parses to a number.
pub trait FromValue: Sized {
    /// Kind name reported when extraction fails.
    const KIND: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const KIND: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    const KIND: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<Value> {
    const KIND: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().map(<[Value]>::to_vec)
    }
}

impl FromValue for IndexMap<String, Value> {
    const KIND: &'static str = "map";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned()
    }
}
