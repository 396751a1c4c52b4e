//! Storage adapters: the operation set a resource needs, and reference implementations.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreBuilder};

use crate::error::StoreError;
use crate::mapping::{FieldMap, Model};
use crate::resource::ChildCollection;
use async_trait::async_trait;

/// Persistence behind a [`Resource`](crate::Resource). `T` is the storage type, `D` the transport type.
///
/// `find` returns `Ok(None)` for an unknown key and `Err(StoreError::KeyFormat)` for a key that cannot be
/// parsed; handlers answer both with 404.
#[async_trait]
pub trait Store<T, D>: Send + Sync + 'static {
    async fn find(&self, key: &str) -> Result<Option<T>, StoreError>;

    async fn find_all(&self) -> Result<Vec<T>, StoreError>;

    async fn search(&self, filter: &D) -> Result<Vec<T>, StoreError>;

    /// Applies `edit` onto `item` and persists the result.
    async fn mutate(&self, item: T, edit: D) -> Result<T, StoreError>;

    /// Inserts a new entity built from `edit`; fails on an empty key or an existing one.
    async fn create(&self, edit: D) -> Result<T, StoreError>;

    async fn delete(&self, item: T) -> Result<T, StoreError>;

    fn to_transport(&self, item: &T) -> D;

    fn children(&self) -> Vec<ChildCollection<T>>;
}

/// One read-only collection per child field of the map.
pub(crate) fn child_collections<T: Model, D>(map: &FieldMap<T, D>) -> Vec<ChildCollection<T>> {
    map.child_fields()
        .map(|f| {
            let field = f.clone();
            ChildCollection::new(f.child_path(), move |item: &T| field.elements(item))
        })
        .collect()
}
