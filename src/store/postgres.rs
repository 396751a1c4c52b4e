//! PostgreSQL store: one table per storage type, columns named after its fields.

use crate::error::{ConfigError, StoreError};
use crate::mapping::{FieldMap, Model};
use crate::resource::ChildCollection;
use crate::sql::{self, Column, PgBindValue, QueryBuf, Relation, Table};
use crate::store::{child_collections, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct PgStore<T, D> {
    pool: PgPool,
    map: Arc<FieldMap<T, D>>,
    table: Table,
    relations: Vec<Relation>,
}

pub struct PgStoreBuilder<T, D> {
    pool: PgPool,
    table: String,
    schema: String,
    relations: Vec<(String, String, String)>,
    soft_delete: Option<String>,
    _types: PhantomData<fn() -> (T, D)>,
}

impl<T: Model, D: Model> PgStoreBuilder<T, D> {
    /// Defaults to `public`.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Loads child field `child_field` from `table` rows whose `foreign_key` equals the parent key.
    /// Such children are read-only: writes through this store never touch `table`.
    pub fn relation(
        mut self,
        child_field: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .push((child_field.into(), table.into(), foreign_key.into()));
        self
    }

    /// Deletes stamp `column` with NOW() instead of removing the row.
    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    pub fn build(self) -> Result<PgStore<T, D>, ConfigError> {
        let map = FieldMap::<T, D>::build()?;
        if self.table.is_empty() {
            return Err(ConfigError::InvalidPath(self.table));
        }

        let mut relations = Vec::with_capacity(self.relations.len());
        for (field, table, foreign_key) in self.relations {
            if !map.child_fields().any(|f| f.name() == field) {
                return Err(ConfigError::UnknownRelation(field));
            }
            relations.push(Relation {
                field,
                schema: self.schema.clone(),
                table,
                foreign_key,
            });
        }

        let columns = map
            .storage_fields()
            .iter()
            .filter(|f| !(f.is_child() && relations.iter().any(|r| r.field == f.name())))
            .map(|f| Column {
                name: f.name().to_string(),
                sql_type: f.sql_type(),
            })
            .collect();
        let table = Table {
            schema: self.schema,
            name: self.table,
            columns,
            key: map.key_field().name().to_string(),
            soft_delete: self.soft_delete,
        };
        tracing::debug!(
            table = %table.name,
            schema = %table.schema,
            relations = relations.len(),
            "postgres store built"
        );

        Ok(PgStore {
            pool: self.pool,
            map: Arc::new(map),
            table,
            relations,
        })
    }
}

impl<T: Model, D: Model> PgStore<T, D> {
    pub fn builder(pool: PgPool, table: impl Into<String>) -> PgStoreBuilder<T, D> {
        PgStoreBuilder {
            pool,
            table: table.into(),
            schema: "public".to_string(),
            relations: Vec::new(),
            soft_delete: None,
            _types: PhantomData,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn field_map(&self) -> &FieldMap<T, D> {
        &self.map
    }

    /// Creates the schema and table when missing. Related tables are not created.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        for ddl in sql::create_table(&self.table) {
            tracing::debug!(sql = %ddl, "ddl");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn values(&self, item: &T) -> Vec<(&'static str, Value)> {
        self.map
            .storage_fields()
            .iter()
            .filter(|f| self.table.column(f.name()).is_some())
            .map(|f| (f.name(), f.read_json(item)))
            .collect()
    }

    fn key_value(&self, item: &T) -> Value {
        self.map.key_field().read_json(item)
    }

    fn decode(&self, row: &PgRow) -> Result<T, StoreError> {
        let mut item = T::default();
        for field in self.map.storage_fields() {
            if self.table.column(field.name()).is_none() {
                continue;
            }
            let value = cell_to_value(row, field.name());
            if value.is_null() {
                continue;
            }
            field
                .write_json(&mut item, value)
                .map_err(|e| StoreError::Decode(format!("column {}: {}", field.name(), e)))?;
        }
        Ok(item)
    }

    /// Fills relation children of `items` with one IN query per relation.
    async fn load_relations(&self, items: &mut [T]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let key_field = self.map.key_field();
        let key_type = key_field.sql_type();
        for rel in &self.relations {
            let Some(child) = self.map.child_fields().find(|f| f.name() == rel.field) else {
                continue;
            };
            let keys: Vec<Value> = items.iter().map(|i| key_field.read_json(i)).collect();
            let q = sql::select_by_column_in(rel, key_type, &keys);
            let rows = self.fetch_all(&q).await?;
            let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
            for row in &rows {
                let value = row_to_json(row);
                let parent = value
                    .get(&rel.foreign_key)
                    .map(json_key_text)
                    .unwrap_or_default();
                grouped.entry(parent).or_default().push(value);
            }
            for item in items.iter_mut() {
                let rows = grouped.remove(&key_field.key_text(item)).unwrap_or_default();
                child
                    .write_json(item, Value::Array(rows))
                    .map_err(|e| StoreError::Decode(format!("relation {}: {}", rel.field, e)))?;
            }
        }
        Ok(())
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for (v, sql_type) in &q.params {
            query = query.bind(PgBindValue::from_json(v, sql_type));
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for (v, sql_type) in &q.params {
            query = query.bind(PgBindValue::from_json(v, sql_type));
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn decode_all(&self, rows: Vec<PgRow>) -> Result<Vec<T>, StoreError> {
        let mut items = rows
            .iter()
            .map(|r| self.decode(r))
            .collect::<Result<Vec<_>, _>>()?;
        self.load_relations(&mut items).await?;
        Ok(items)
    }

    async fn decode_one(&self, row: &PgRow) -> Result<T, StoreError> {
        let mut items = vec![self.decode(row)?];
        self.load_relations(&mut items).await?;
        items
            .pop()
            .ok_or_else(|| StoreError::Decode("row vanished during decode".into()))
    }
}

#[async_trait]
impl<T: Model, D: Model> Store<T, D> for PgStore<T, D> {
    async fn find(&self, key: &str) -> Result<Option<T>, StoreError> {
        let template = self.map.keyed_template(key)?;
        let q = sql::select_by_key(&self.table, self.key_value(&template));
        match self.fetch_optional(&q).await? {
            Some(row) => Ok(Some(self.decode_one(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> Result<Vec<T>, StoreError> {
        let q = sql::select_list(&self.table, &[]);
        let rows = self.fetch_all(&q).await?;
        self.decode_all(rows).await
    }

    async fn search(&self, filter: &D) -> Result<Vec<T>, StoreError> {
        let mask = self.map.mask(filter);
        let q = sql::select_list(&self.table, &mask);
        let rows = self.fetch_all(&q).await?;
        self.decode_all(rows).await
    }

    async fn mutate(&self, item: T, edit: D) -> Result<T, StoreError> {
        let updated = self.map.apply_edit(item, &edit)?;
        let q = sql::upsert(&self.table, &self.values(&updated));
        match self.fetch_optional(&q).await? {
            Some(row) => self.decode_one(&row).await,
            None => Err(StoreError::Failed(format!(
                "upsert of key '{}' returned no row",
                self.map.storage_key(&updated)
            ))),
        }
    }

    async fn create(&self, edit: D) -> Result<T, StoreError> {
        let key = self.map.transport_key(&edit).ok_or(StoreError::MissingKey)?;
        let template = self.map.keyed_template(&key)?;
        let item = self.map.from_transport(template, &edit);
        let q = sql::insert(&self.table, &self.values(&item));
        match self.fetch_optional(&q).await {
            Ok(Some(row)) => self.decode_one(&row).await,
            Ok(None) => Err(StoreError::Failed(format!("insert of key '{}' returned no row", key))),
            Err(StoreError::Db(sqlx::Error::Database(e))) if e.is_unique_violation() => {
                Err(StoreError::Conflict(key))
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, item: T) -> Result<T, StoreError> {
        let q = sql::delete(&self.table, self.key_value(&item));
        match self.fetch_optional(&q).await? {
            Some(row) => self.decode(&row),
            None => Err(StoreError::NotFound(self.map.storage_key(&item))),
        }
    }

    fn to_transport(&self, item: &T) -> D {
        self.map.to_transport(item)
    }

    fn children(&self) -> Vec<ChildCollection<T>> {
        child_collections(&self.map)
    }
}

fn json_key_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decodes one cell by trying the column types fields map to.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
