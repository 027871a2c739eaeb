//! Coarse parameter types and default-value rendering.
//!
//! Every declared parameter collapses to one JSON-schema style tag. The tag is
//! chosen at compile time through [`JsonType`], so no runtime type inspection
//! happens during registry build.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Parameter type tag exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Number,
    Array,
    Object,
    Null,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Number => "number",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Null => "null",
        }
    }

    /// Validate a JSON value against this tag.
    pub fn validate(self, value: &Value) -> Result<(), String> {
        let ok = match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Number => value.is_number(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Null => value.is_null(),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self, value_type_name(value)))
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type name of a value, as reported in validation messages.
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Compile-time type mapping
// =============================================================================

/// Static mapping from a Rust type to its parameter tag.
///
/// `Option<T>` takes the tag of `T` and marks the parameter nullable. Types
/// without a natural scalar or sequence shape should declare `Object`.
pub trait JsonType {
    const TYPE: ParamType;
    const NULLABLE: bool = false;
}

macro_rules! json_type {
    ($tag:expr => $($ty:ty),+ $(,)?) => {
        $(impl JsonType for $ty {
            const TYPE: ParamType = $tag;
        })+
    };
}

json_type!(ParamType::String => String, str, char);
json_type!(ParamType::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
json_type!(ParamType::Number => f32, f64);
json_type!(ParamType::Boolean => bool);
json_type!(ParamType::Object => Value, Map<String, Value>);
json_type!(ParamType::Null => ());

impl<T: JsonType + ?Sized> JsonType for &T {
    const TYPE: ParamType = T::TYPE;
    const NULLABLE: bool = T::NULLABLE;
}

impl<T: JsonType> JsonType for Option<T> {
    const TYPE: ParamType = T::TYPE;
    const NULLABLE: bool = true;
}

impl<T> JsonType for Vec<T> {
    const TYPE: ParamType = ParamType::Array;
}

impl<T> JsonType for [T] {
    const TYPE: ParamType = ParamType::Array;
}

impl<T> JsonType for VecDeque<T> {
    const TYPE: ParamType = ParamType::Array;
}

impl<T, S> JsonType for HashSet<T, S> {
    const TYPE: ParamType = ParamType::Array;
}

impl<T> JsonType for BTreeSet<T> {
    const TYPE: ParamType = ParamType::Array;
}

impl<K, V, S> JsonType for HashMap<K, V, S> {
    const TYPE: ParamType = ParamType::Object;
}

impl<K, V> JsonType for BTreeMap<K, V> {
    const TYPE: ParamType = ParamType::Object;
}

// =============================================================================
// Default values
// =============================================================================

/// Render a default value for the parameter listing.
///
/// Lossless JSON when serde can encode it, otherwise `"<TypeName: {value:?}>"`.
pub fn serialize_default<D: Serialize + fmt::Debug + ?Sized>(value: &D) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(_) => Value::String(format!("<{}: {:?}>", short_type_name::<D>(), value)),
    }
}

/// Placeholder for defaults that have no serde representation at all.
pub fn opaque_default<D: fmt::Display + ?Sized>(value: &D) -> Value {
    Value::String(format!("<{}: {}>", short_type_name::<D>(), value))
}

/// Placeholder for a default computed by a function.
pub fn callable_default(name: &str) -> Value {
    Value::String(format!("<function: {}>", name))
}

/// Last path segment of a type name, generics included.
fn short_type_name<D: ?Sized>() -> &'static str {
    let full = std::any::type_name::<D>();
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}
