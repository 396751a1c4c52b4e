//! DTO conversion and filtering through a prebuilt [`FieldMap`].

use crate::error::{KeyFormatError, StoreError};
use crate::mapping::field::Model;
use crate::mapping::map::FieldMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Per-field predicate used when a DTO acts as a search filter.
#[derive(Clone, Copy, Default)]
pub enum MatchPolicy {
    /// Substring match for strings, equality for everything else.
    #[default]
    Contains,
    Exact,
    /// Called as `(filter value, entity value)`.
    Custom(fn(&Value, &Value) -> bool),
}

impl fmt::Debug for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Contains => f.write_str("Contains"),
            MatchPolicy::Exact => f.write_str("Exact"),
            MatchPolicy::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl MatchPolicy {
    pub fn accepts(&self, filter: &Value, value: &Value) -> bool {
        match self {
            MatchPolicy::Contains => match (filter, value) {
                (Value::String(f), Value::String(v)) => v.contains(f.as_str()),
                _ => filter == value,
            },
            MatchPolicy::Exact => filter == value,
            MatchPolicy::Custom(f) => f(filter, value),
        }
    }
}

impl<T: Model, D: Model> FieldMap<T, D> {
    /// Storage → transport. Identical types clone straight through; otherwise unmapped DTO fields stay default.
    pub fn to_transport(&self, entity: &T) -> D {
        if self.identical {
            let boxed: Box<dyn Any> = Box::new(entity.clone());
            if let Ok(same) = boxed.downcast::<D>() {
                return *same;
            }
        }
        let mut out = D::default();
        for link in &self.links {
            let value = self.storage[link.storage].read(entity);
            self.transport[link.transport].write(&mut out, value);
        }
        out
    }

    /// Transport → storage, starting from `base`. Storage-only fields keep their values from `base`.
    pub fn from_transport(&self, base: T, dto: &D) -> T {
        let mut out = base;
        let key = self.transport[self.key.transport].read(dto);
        self.storage[self.key.storage].write(&mut out, key);
        for link in &self.links {
            let value = self.transport[link.transport].read(dto);
            self.storage[link.storage].write(&mut out, value);
        }
        out
    }

    /// Applies an edit to a located entity. An empty or zero key in `dto` keeps the entity's key; any other
    /// key must equal it.
    pub fn apply_edit(&self, item: T, dto: &D) -> Result<T, StoreError> {
        let current = self.storage_key(&item);
        match self.transport_key(dto) {
            Some(body) if body != current => Err(StoreError::KeyMismatch {
                path: current,
                body,
            }),
            Some(_) => Ok(self.from_transport(item, dto)),
            None => {
                let key = self.key_field().read(&item);
                let mut out = self.from_transport(item, dto);
                self.key_field().write(&mut out, key);
                Ok(out)
            }
        }
    }

    /// A default entity with only the key set, parsed from its URL text.
    pub fn keyed_template(&self, key: &str) -> Result<T, KeyFormatError> {
        let mut item = T::default();
        self.key_field().write_key(&mut item, key)?;
        Ok(item)
    }

    /// Key text of a DTO, or `None` when the key is empty or zero.
    pub fn transport_key(&self, dto: &D) -> Option<String> {
        let field = self.transport_key_field();
        if field.is_zero(dto) {
            None
        } else {
            Some(field.key_text(dto))
        }
    }

    pub fn storage_key(&self, entity: &T) -> String {
        self.key_field().key_text(entity)
    }

    /// True when every non-zero mapped filter field accepts the entity's value.
    pub fn matches(&self, filter: &D, entity: &T, policy: MatchPolicy) -> bool {
        self.pairs().all(|(df, tf)| {
            df.is_zero(filter) || policy.accepts(&df.read_json(filter), &tf.read_json(entity))
        })
    }

    /// Equality mask for a database query: storage column name and value of every non-zero filter field.
    pub fn mask(&self, filter: &D) -> Vec<(&'static str, Value)> {
        let template = self.from_transport(T::default(), filter);
        let key = self.key.storage;
        let mut out = Vec::new();
        let indices = std::iter::once(key).chain(
            self.links
                .iter()
                .map(|l| l.storage)
                .filter(|&i| i != key),
        );
        for i in indices {
            let f = &self.storage[i];
            if !f.is_zero(&template) {
                out.push((f.name(), f.read_json(&template)));
            }
        }
        out
    }
}
