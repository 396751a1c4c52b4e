//! Field correspondence between a storage type and its transport (DTO) type, built once per resource.

use crate::error::ConfigError;
use crate::mapping::field::{Field, Model};
use std::any::TypeId;
use std::collections::HashSet;

/// Index pair: position of a field in the transport field list and its counterpart in the storage list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub transport: usize,
    pub storage: usize,
}

pub struct FieldMap<T, D> {
    pub(crate) storage: Vec<Field<T>>,
    pub(crate) transport: Vec<Field<D>>,
    pub(crate) links: Vec<Link>,
    pub(crate) key: Link,
    pub(crate) children: Vec<usize>,
    pub(crate) identical: bool,
}

impl<T: Model, D: Model> FieldMap<T, D> {
    /// Validates the two field lists against each other and records the correspondence.
    pub fn build() -> Result<Self, ConfigError> {
        let storage = T::fields();
        let transport = D::fields();
        let storage_name = std::any::type_name::<T>();
        let transport_name = std::any::type_name::<D>();
        check_unique(&storage, storage_name)?;
        check_unique(&transport, transport_name)?;

        let mut links = Vec::new();
        for (ti, tf) in transport.iter().enumerate() {
            if tf.is_excluded() {
                continue;
            }
            let (si, sf) = storage
                .iter()
                .enumerate()
                .find(|(_, sf)| sf.name() == tf.name())
                .ok_or(ConfigError::UnmappedField {
                    field: tf.name(),
                    transport: transport_name,
                    storage: storage_name,
                })?;
            if !sf.same_type(tf) {
                return Err(ConfigError::TypeMismatch {
                    field: tf.name(),
                    transport_type: tf.type_name(),
                    storage_type: sf.type_name(),
                });
            }
            if sf.is_child() {
                if !tf.is_child() {
                    return Err(ConfigError::ChildInTransport {
                        field: tf.name(),
                        transport: transport_name,
                    });
                }
                continue;
            }
            links.push(Link {
                transport: ti,
                storage: si,
            });
        }

        let key = resolve_key(&storage, &transport, storage_name, transport_name)?;

        let mut children = Vec::new();
        let mut paths = HashSet::new();
        for (si, sf) in storage.iter().enumerate().filter(|(_, f)| f.is_child()) {
            if !sf.is_sequence() {
                return Err(ConfigError::ChildNotSequence {
                    field: sf.name(),
                    type_name: sf.type_name(),
                });
            }
            if !paths.insert(sf.child_path()) {
                return Err(ConfigError::DuplicatePath(sf.child_path()));
            }
            children.push(si);
        }

        tracing::debug!(
            storage = storage_name,
            transport = transport_name,
            links = links.len(),
            key = storage[key.storage].name(),
            "field map built"
        );

        Ok(FieldMap {
            storage,
            transport,
            links,
            key,
            children,
            identical: TypeId::of::<T>() == TypeId::of::<D>(),
        })
    }
}

impl<T, D> FieldMap<T, D> {
    /// Mapped (transport, storage) field pairs, in transport declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Field<D>, &Field<T>)> + '_ {
        self.links
            .iter()
            .map(|l| (&self.transport[l.transport], &self.storage[l.storage]))
    }

    pub fn key_field(&self) -> &Field<T> {
        &self.storage[self.key.storage]
    }

    pub fn transport_key_field(&self) -> &Field<D> {
        &self.transport[self.key.transport]
    }

    pub fn child_fields(&self) -> impl Iterator<Item = &Field<T>> + '_ {
        self.children.iter().map(|&i| &self.storage[i])
    }

    pub fn storage_fields(&self) -> &[Field<T>] {
        &self.storage
    }

    pub fn is_identical(&self) -> bool {
        self.identical
    }
}

fn check_unique<X: 'static>(fields: &[Field<X>], owner: &'static str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for f in fields {
        if !seen.insert(f.name()) {
            return Err(ConfigError::DuplicateField {
                field: f.name(),
                owner,
            });
        }
    }
    Ok(())
}

/// Explicit `key()` marking wins; otherwise a field named `id`.
fn resolve_key<T: 'static, D: 'static>(
    storage: &[Field<T>],
    transport: &[Field<D>],
    storage_name: &'static str,
    transport_name: &'static str,
) -> Result<Link, ConfigError> {
    let marked: Vec<usize> = storage
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_key())
        .map(|(i, _)| i)
        .collect();
    let si = match marked.as_slice() {
        [one] => *one,
        [] => storage
            .iter()
            .position(|f| f.name() == "id")
            .ok_or(ConfigError::MissingKeyField(storage_name))?,
        many => {
            return Err(ConfigError::AmbiguousKey {
                storage: storage_name,
                fields: many
                    .iter()
                    .map(|&i| storage[i].name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    };
    let sf = &storage[si];
    if sf.key_kind().is_none() {
        return Err(ConfigError::UnsupportedKeyType {
            field: sf.name(),
            type_name: sf.type_name(),
        });
    }
    let ti = transport
        .iter()
        .position(|f| f.name() == sf.name())
        .ok_or(ConfigError::MissingTransportKey {
            field: sf.name(),
            transport: transport_name,
        })?;
    if !sf.same_type(&transport[ti]) {
        return Err(ConfigError::TypeMismatch {
            field: sf.name(),
            transport_type: transport[ti].type_name(),
            storage_type: sf.type_name(),
        });
    }
    Ok(Link {
        transport: ti,
        storage: si,
    })
}
