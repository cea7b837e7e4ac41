//! An in-memory key/value storage that resolves deferred values on read.
//!
//! Core concepts:
//! - **Value**: a literal, or a deferred value resolved on every read
//! - **Computation**: a zero-argument callable producing a value
//! - **SingleValue**: an object exposing one value through an accessor
//! - **MultiValue**: a provider of key/value pairs, flattened when added
//! - **ValueStorage**: an ordered map of raw entries with a resolving read path
//!
//! # Example
//!
//! ```
//! use value_storage_core::{Value, ValueStorage};
//!
//! let mut storage = ValueStorage::new();
//! let answer = Value::computation(|| 42);
//!
//! storage.add_value("answer", answer.clone()).add_value("name", "deep thought");
//!
//! // Raw reads return the stored entry itself
//! assert_eq!(storage.get("answer"), Some(&answer));
//!
//! // Resolving reads invoke it
//! assert_eq!(storage.get_value("answer").unwrap(), Some(Value::Int(42)));
//! ```
//!
//! # Resolution
//!
//! `get_value` performs at most two unwrapping steps: a computation is
//! invoked, then a value object (stored or computed) is asked for its value.
//! Results are never cached and the stored entry is never replaced.
//! Collaborator errors are returned unchanged.

mod error;
mod provider;
mod serde_impls;
mod shared;
mod storage;
mod value;

pub use error::ValueError;
pub use indexmap::IndexMap;
pub use provider::{BoxError, Computation, MultiValue, SingleValue};
pub use shared::SharedValueStorage;
pub use storage::ValueStorage;
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use value_storage_derive::{SingleValue, Values};
