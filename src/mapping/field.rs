//! Field descriptors: one per struct field, holding precomputed accessors instead of runtime reflection.

use crate::error::KeyFormatError;
use crate::mapping::value::{FieldValue, KeyKind};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A struct whose fields can be mapped, stored and exposed over REST.
///
/// ```ignore
/// impl Model for Employee {
///     fn fields() -> Vec<Field<Self>> {
///         vec![
///             field!(Employee, employee_no).key(),
///             field!(Employee, name),
///             field!(Employee, reports).child(),
///         ]
///     }
/// }
/// ```
pub trait Model: Default + Clone + Send + Sync + 'static {
    fn fields() -> Vec<Field<Self>>;
}

/// Builds a [`Field`] for `$ty::$name` with accessors that borrow the struct field directly.
#[macro_export]
macro_rules! field {
    ($ty:ty, $name:ident) => {
        $crate::Field::<$ty>::new(
            stringify!($name),
            |item| &item.$name,
            |item| &mut item.$name,
        )
    };
}

/// Type-erased access to one field of `T`.
trait Access<T>: Send + Sync {
    fn read(&self, item: &T) -> Box<dyn Any + Send>;
    /// Returns false when `value` is not of the field's type.
    fn write(&self, item: &mut T, value: Box<dyn Any + Send>) -> bool;
    fn read_json(&self, item: &T) -> Value;
    fn write_json(&self, item: &mut T, value: Value) -> Result<(), serde_json::Error>;
    fn is_zero(&self, item: &T) -> bool;
    fn key_text(&self, item: &T) -> String;
    fn write_key(&self, item: &mut T, text: &str) -> Result<(), KeyFormatError>;
    fn elements(&self, item: &T) -> Vec<Value>;
}

struct Lens<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T: 'static, V: FieldValue> Access<T> for Lens<T, V> {
    fn read(&self, item: &T) -> Box<dyn Any + Send> {
        Box::new((self.get)(item).clone())
    }

    fn write(&self, item: &mut T, value: Box<dyn Any + Send>) -> bool {
        match value.downcast::<V>() {
            Ok(v) => {
                *(self.get_mut)(item) = *v;
                true
            }
            Err(_) => false,
        }
    }

    fn read_json(&self, item: &T) -> Value {
        serde_json::to_value((self.get)(item)).unwrap_or(Value::Null)
    }

    fn write_json(&self, item: &mut T, value: Value) -> Result<(), serde_json::Error> {
        *(self.get_mut)(item) = serde_json::from_value(value)?;
        Ok(())
    }

    fn is_zero(&self, item: &T) -> bool {
        (self.get)(item).is_zero()
    }

    fn key_text(&self, item: &T) -> String {
        (self.get)(item).key_text()
    }

    fn write_key(&self, item: &mut T, text: &str) -> Result<(), KeyFormatError> {
        *(self.get_mut)(item) = V::parse_key(text)?;
        Ok(())
    }

    fn elements(&self, item: &T) -> Vec<Value> {
        (self.get)(item).elements()
    }
}

/// Descriptor of one struct field: name, value type and the flags that drive mapping and routing.
pub struct Field<T> {
    name: &'static str,
    value_type: TypeId,
    type_name: &'static str,
    key_kind: Option<KeyKind>,
    sequence: bool,
    sql_type: &'static str,
    key: bool,
    child: bool,
    excluded: bool,
    access: Arc<dyn Access<T>>,
}

impl<T: 'static> Field<T> {
    pub fn new<V: FieldValue>(
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        Field {
            name,
            value_type: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            key_kind: V::key_kind(),
            sequence: V::is_sequence(),
            sql_type: V::sql_type(),
            key: false,
            child: false,
            excluded: false,
            access: Arc::new(Lens { get, get_mut }),
        }
    }

    /// Marks the entity key on a storage type.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Exposes a sequence field as the read-only sub-path `/:id/<lower-cased name>`.
    pub fn child(mut self) -> Self {
        self.child = true;
        self
    }

    /// Keeps a transport field out of the mapping, so decoding never overwrites its storage counterpart.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn key_kind(&self) -> Option<KeyKind> {
        self.key_kind
    }

    pub fn sql_type(&self) -> &'static str {
        self.sql_type
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn is_child(&self) -> bool {
        self.child
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn is_sequence(&self) -> bool {
        self.sequence
    }

    pub fn child_path(&self) -> String {
        self.name.to_lowercase()
    }

    pub(crate) fn same_type<U>(&self, other: &Field<U>) -> bool {
        self.value_type == other.value_type
    }

    pub(crate) fn read(&self, item: &T) -> Box<dyn Any + Send> {
        self.access.read(item)
    }

    pub(crate) fn write(&self, item: &mut T, value: Box<dyn Any + Send>) -> bool {
        self.access.write(item, value)
    }

    pub fn read_json(&self, item: &T) -> Value {
        self.access.read_json(item)
    }

    pub fn write_json(&self, item: &mut T, value: Value) -> Result<(), serde_json::Error> {
        self.access.write_json(item, value)
    }

    pub fn is_zero(&self, item: &T) -> bool {
        self.access.is_zero(item)
    }

    pub fn key_text(&self, item: &T) -> String {
        self.access.key_text(item)
    }

    pub(crate) fn write_key(&self, item: &mut T, text: &str) -> Result<(), KeyFormatError> {
        self.access.write_key(item, text)
    }

    pub fn elements(&self, item: &T) -> Vec<Value> {
        self.access.elements(item)
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Field {
            name: self.name,
            value_type: self.value_type,
            type_name: self.type_name,
            key_kind: self.key_kind,
            sequence: self.sequence,
            sql_type: self.sql_type,
            key: self.key,
            child: self.child,
            excluded: self.excluded,
            access: Arc::clone(&self.access),
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("key", &self.key)
            .field("child", &self.child)
            .field("excluded", &self.excluded)
            .finish()
    }
}
