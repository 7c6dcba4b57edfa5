//! Value coercion layer
//!
//! Keys, the store's native value model, the caller-facing value model and
//! the conversions between them.

mod clock;
mod coercion;
mod errors;
mod json;
mod key;
mod native;
mod query;

pub use clock::{Clock, FixedClock, SystemClock};
pub use coercion::{
    from_native, key_to_query, to_ancestor_key, to_key, to_native, KeyFormat, ValueKind,
};
pub use errors::CoercionError;
pub use json::{key_from_json, native_from_json, native_to_json};
pub use key::{Key, KeyError, KeyId, PathElement};
pub use native::NativeValue;
pub use query::{ObjectRef, QueryValue};
