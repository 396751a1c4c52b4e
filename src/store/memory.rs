//! In-memory store keyed by the entity's key text.

use crate::error::{ConfigError, StoreError};
use crate::mapping::{FieldMap, MatchPolicy, Model};
use crate::resource::ChildCollection;
use crate::store::{child_collections, Store};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub struct MemoryStore<T, D> {
    map: Arc<FieldMap<T, D>>,
    entries: RwLock<BTreeMap<String, T>>,
    policy: MatchPolicy,
}

impl<T: Model, D: Model> MemoryStore<T, D> {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(MemoryStore {
            map: Arc::new(FieldMap::build()?),
            entries: RwLock::new(BTreeMap::new()),
            policy: MatchPolicy::default(),
        })
    }

    /// Predicate used by `search`.
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn field_map(&self) -> &FieldMap<T, D> {
        &self.map
    }

    /// Stores `item` under its key, replacing any previous entry.
    pub fn insert(&self, item: T) -> Result<(), StoreError> {
        let key = self.map.storage_key(&item);
        self.write()?.insert(key, item);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, T>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Failed("store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, T>>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Failed("store lock poisoned".into()))
    }
}

#[async_trait]
impl<T: Model, D: Model> Store<T, D> for MemoryStore<T, D> {
    async fn find(&self, key: &str) -> Result<Option<T>, StoreError> {
        // Round-trip through the key type so "007" finds the entry stored as 7.
        let template = self.map.keyed_template(key)?;
        let key = self.map.storage_key(&template);
        self.get(&key)
    }

    async fn find_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn search(&self, filter: &D) -> Result<Vec<T>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|e| self.map.matches(filter, e, self.policy))
            .cloned()
            .collect())
    }

    async fn mutate(&self, item: T, edit: D) -> Result<T, StoreError> {
        let updated = self.map.apply_edit(item, &edit)?;
        self.insert(updated.clone())?;
        tracing::debug!(key = %self.map.storage_key(&updated), "entry updated");
        Ok(updated)
    }

    async fn create(&self, edit: D) -> Result<T, StoreError> {
        let key = self.map.transport_key(&edit).ok_or(StoreError::MissingKey)?;
        let template = self.map.keyed_template(&key)?;
        let item = self.map.from_transport(template, &edit);
        let key = self.map.storage_key(&item);
        let mut entries = self.write()?;
        if entries.contains_key(&key) {
            return Err(StoreError::Conflict(key));
        }
        entries.insert(key, item.clone());
        Ok(item)
    }

    async fn delete(&self, item: T) -> Result<T, StoreError> {
        let key = self.map.storage_key(&item);
        self.write()?
            .remove(&key)
            .ok_or(StoreError::NotFound(key))
    }

    fn to_transport(&self, item: &T) -> D {
        self.map.to_transport(item)
    }

    fn children(&self) -> Vec<ChildCollection<T>> {
        child_collections(&self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::mapping::Field;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Item {
        id: u32,
        name: String,
        secret: String,
        parts: Vec<String>,
    }

    impl Model for Item {
        fn fields() -> Vec<Field<Self>> {
            vec![
                field!(Item, id),
                field!(Item, name),
                field!(Item, secret),
                field!(Item, parts).child(),
            ]
        }
    }

    #[derive(Clone, Default, Debug, PartialEq)]
    struct ItemDto {
        id: u32,
        name: String,
    }

    impl Model for ItemDto {
        fn fields() -> Vec<Field<Self>> {
            vec![field!(ItemDto, id), field!(ItemDto, name)]
        }
    }

    fn store() -> MemoryStore<Item, ItemDto> {
        let s = MemoryStore::new().unwrap();
        s.insert(Item {
            id: 1,
            name: "alpha".into(),
            secret: "s1".into(),
            parts: vec!["a".into(), "b".into()],
        })
        .unwrap();
        s.insert(Item {
            id: 2,
            name: "beta".into(),
            secret: "s2".into(),
            parts: vec![],
        })
        .unwrap();
        s
    }

    fn dto(id: u32, name: &str) -> ItemDto {
        ItemDto {
            id,
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn find_parses_the_key() {
        let s = store();
        assert_eq!(s.find("01").await.unwrap().map(|i| i.name), Some("alpha".into()));
        assert!(s.find("3").await.unwrap().is_none());
        assert!(matches!(s.find("one").await, Err(StoreError::KeyFormat(_))));
    }

    #[tokio::test]
    async fn create_rejects_missing_and_existing_keys() {
        let s = store();
        assert!(matches!(s.create(dto(0, "zero")).await, Err(StoreError::MissingKey)));
        assert!(matches!(s.create(dto(1, "again")).await, Err(StoreError::Conflict(k)) if k == "1"));
        assert_eq!(s.get("1").unwrap().unwrap().name, "alpha");
        let created = s.create(dto(3, "gamma")).await.unwrap();
        assert_eq!(created.secret, "");
        assert_eq!(s.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn mutate_keeps_storage_only_fields() {
        let s = store();
        let item = s.find("1").await.unwrap().unwrap();
        let updated = s.mutate(item, dto(1, "renamed")).await.unwrap();
        assert_eq!(updated.secret, "s1");
        assert_eq!(updated.parts.len(), 2);
        assert_eq!(s.get("1").unwrap().unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn mutate_keeps_the_key_when_the_edit_has_none() {
        let s = store();
        let item = s.find("1").await.unwrap().unwrap();
        let updated = s.mutate(item, dto(0, "unkeyed")).await.unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(s.len().unwrap(), 2);
        assert_eq!(s.get("1").unwrap().unwrap().name, "unkeyed");
    }

    #[tokio::test]
    async fn mutate_refuses_a_different_key() {
        let s = store();
        let item = s.find("1").await.unwrap().unwrap();
        let err = s.mutate(item, dto(5, "moved")).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { ref path, ref body } if path == "1" && body == "5"));
        assert!(s.get("5").unwrap().is_none());
        assert_eq!(s.get("1").unwrap().unwrap().name, "alpha");
    }

    #[tokio::test]
    async fn search_uses_the_policy() {
        let s = store();
        let hits = s.search(&dto(0, "lph")).await.unwrap();
        assert_eq!(hits.len(), 1);
        let exact = store().with_policy(MatchPolicy::Exact);
        assert!(exact.search(&dto(0, "lph")).await.unwrap().is_empty());
        assert_eq!(s.search(&ItemDto::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let s = store();
        let item = s.find("2").await.unwrap().unwrap();
        s.delete(item.clone()).await.unwrap();
        assert!(s.get("2").unwrap().is_none());
        assert!(matches!(s.delete(item).await, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn children_enumerate_sequence_fields() {
        let s = store();
        let children = Store::<Item, ItemDto>::children(&s);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path(), "parts");
        let item = s.get("1").unwrap().unwrap();
        assert_eq!((children[0].get)(&item).len(), 2);
    }
}
