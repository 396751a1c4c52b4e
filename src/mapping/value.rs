//! Value types a mapped field may hold, and what each can do (key, sequence, SQL type).

use crate::error::KeyFormatError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt::Debug;

/// How a key field's text from the URL path is converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Text,
    Signed,
    Unsigned,
    Uuid,
}

/// A type usable as a field of a [`Model`](crate::Model).
///
/// Implemented for strings, booleans, integers, floats, `Uuid`, `DateTime<Utc>`, `serde_json::Value`,
/// `Option<V>` and `Vec<V>`. Nested structs can opt in with an empty impl, which gives them zero detection
/// and JSON conversion but no key or sequence capability.
pub trait FieldValue:
    Any + Clone + Default + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// `Some` when the type can identify an entity in a URL path.
    fn key_kind() -> Option<KeyKind> {
        None
    }

    fn parse_key(text: &str) -> Result<Self, KeyFormatError> {
        Err(KeyFormatError {
            value: text.to_string(),
            expected: std::any::type_name::<Self>(),
        })
    }

    /// Text form of a key value, as it appears in the URL path.
    fn key_text(&self) -> String {
        String::new()
    }

    fn is_sequence() -> bool {
        false
    }

    /// Elements of a sequence as JSON; empty for non-sequences.
    fn elements(&self) -> Vec<Value> {
        Vec::new()
    }

    /// Empty string, zero, `None`, empty vec: a wildcard in filters and a missing key on create.
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// PostgreSQL type used to cast bound parameters.
    fn sql_type() -> &'static str {
        "jsonb"
    }
}

impl FieldValue for String {
    fn key_kind() -> Option<KeyKind> {
        Some(KeyKind::Text)
    }

    fn parse_key(text: &str) -> Result<Self, KeyFormatError> {
        Ok(text.to_string())
    }

    fn key_text(&self) -> String {
        self.clone()
    }

    fn sql_type() -> &'static str {
        "text"
    }
}

macro_rules! integer_field {
    ($kind:expr; $($t:ty => $sql:literal),* $(,)?) => {
        $(
            impl FieldValue for $t {
                fn key_kind() -> Option<KeyKind> {
                    Some($kind)
                }

                fn parse_key(text: &str) -> Result<Self, KeyFormatError> {
                    text.parse::<$t>().map_err(|_| KeyFormatError {
                        value: text.to_string(),
                        expected: stringify!($t),
                    })
                }

                fn key_text(&self) -> String {
                    self.to_string()
                }

                fn sql_type() -> &'static str {
                    $sql
                }
            }
        )*
    };
}

integer_field!(KeyKind::Signed; i8 => "int2", i16 => "int2", i32 => "int4", i64 => "int8", isize => "int8");
integer_field!(KeyKind::Unsigned; u8 => "int2", u16 => "int4", u32 => "int8", u64 => "int8", usize => "int8");

impl FieldValue for uuid::Uuid {
    fn key_kind() -> Option<KeyKind> {
        Some(KeyKind::Uuid)
    }

    fn parse_key(text: &str) -> Result<Self, KeyFormatError> {
        uuid::Uuid::parse_str(text).map_err(|_| KeyFormatError {
            value: text.to_string(),
            expected: "uuid",
        })
    }

    fn key_text(&self) -> String {
        self.to_string()
    }

    fn sql_type() -> &'static str {
        "uuid"
    }
}

impl FieldValue for bool {
    fn sql_type() -> &'static str {
        "bool"
    }
}

impl FieldValue for f32 {
    fn sql_type() -> &'static str {
        "float4"
    }
}

impl FieldValue for f64 {
    fn sql_type() -> &'static str {
        "float8"
    }
}

impl FieldValue for chrono::DateTime<chrono::Utc> {
    fn sql_type() -> &'static str {
        "timestamptz"
    }
}

impl FieldValue for Value {}

impl<V: FieldValue> FieldValue for Option<V> {
    fn sql_type() -> &'static str {
        V::sql_type()
    }
}

impl<V> FieldValue for Vec<V>
where
    V: Any + Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync,
{
    fn is_sequence() -> bool {
        true
    }

    fn elements(&self) -> Vec<Value> {
        self.iter()
            .map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
            .collect()
    }
}
