//! Builds parameterized SELECT, INSERT, upsert and DELETE statements for a mapped table.

use serde_json::Value;

/// One stored column and the PostgreSQL type its parameters are cast to.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: &'static str,
}

/// Table backing a store: identifiers come from field names and builder calls, never from requests.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub key: String,
    /// Timestamp column set on delete; rows where it is not NULL are invisible.
    pub soft_delete: Option<String>,
}

/// Related table read into a child field: rows whose `foreign_key` equals the parent key.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub field: String,
    pub schema: String,
    pub table: String,
    pub foreign_key: String,
}

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    /// Bound values with the type each is cast to.
    pub params: Vec<(Value, &'static str)>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Pushes a value and returns its cast placeholder, e.g. `$2::int8`.
    fn push_param(&mut self, v: Value, sql_type: &'static str) -> String {
        self.params.push((v, sql_type));
        format!("${}::{}", self.params.len(), sql_type)
    }
}

impl Table {
    fn qualified(&self) -> String {
        qualified_table(&self.schema, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn key_type(&self) -> &'static str {
        self.column(&self.key).map(|c| c.sql_type).unwrap_or("text")
    }

    fn select_column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quoted(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn visible(&self) -> Option<String> {
        self.soft_delete
            .as_deref()
            .map(|c| format!("{} IS NULL", quoted(c)))
    }
}

/// SELECT one row by key.
pub fn select_by_key(table: &Table, key: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(key, table.key_type());
    let mut where_parts = vec![format!("{} = {}", quoted(&table.key), ph)];
    where_parts.extend(table.visible());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 1",
        table.select_column_list(),
        table.qualified(),
        where_parts.join(" AND ")
    );
    q
}

/// SELECT with equality filters on known columns, ORDER BY key. Unknown columns are skipped.
pub fn select_list(table: &Table, filters: &[(&str, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        let Some(c) = table.column(col) else { continue };
        let ph = q.push_param(val.clone(), c.sql_type);
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }
    where_parts.extend(table.visible());
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        table.select_column_list(),
        table.qualified(),
        where_clause,
        quoted(&table.key)
    );
    q
}

/// SELECT * FROM related WHERE foreign_key IN (...). Batch-loads a relation for many parents.
pub fn select_by_column_in(relation: &Relation, key_type: &'static str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&relation.schema, &relation.table);
    if values.is_empty() {
        q.sql = format!("SELECT * FROM {} WHERE 1 = 0", table);
        return q;
    }
    let placeholders: Vec<String> = values
        .iter()
        .map(|v| q.push_param(v.clone(), key_type))
        .collect();
    q.sql = format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        table,
        quoted(&relation.foreign_key),
        placeholders.join(", ")
    );
    q
}

/// INSERT every column; values not given are bound as NULL.
pub fn insert(table: &Table, values: &[(&str, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let (cols, placeholders) = bind_columns(&mut q, table, values);
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table.qualified(),
        cols.join(", "),
        placeholders.join(", "),
        table.select_column_list()
    );
    q
}

/// INSERT, or UPDATE every non-key column when the key already exists.
pub fn upsert(table: &Table, values: &[(&str, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let (cols, placeholders) = bind_columns(&mut q, table, values);
    let sets: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.name != table.key)
        .map(|c| format!("{0} = EXCLUDED.{0}", quoted(&c.name)))
        .collect();
    let conflict = if sets.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", sets.join(", "))
    };
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {} RETURNING {}",
        table.qualified(),
        cols.join(", "),
        placeholders.join(", "),
        quoted(&table.key),
        conflict,
        table.select_column_list()
    );
    q
}

/// DELETE by key, or stamp the soft-delete column.
pub fn delete(table: &Table, key: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(key, table.key_type());
    let returning = table.select_column_list();
    q.sql = match &table.soft_delete {
        Some(col) => format!(
            "UPDATE {} SET {} = NOW() WHERE {} = {} AND {} IS NULL RETURNING {}",
            table.qualified(),
            quoted(col),
            quoted(&table.key),
            ph,
            quoted(col),
            returning
        ),
        None => format!(
            "DELETE FROM {} WHERE {} = {} RETURNING {}",
            table.qualified(),
            quoted(&table.key),
            ph,
            returning
        ),
    };
    q
}

/// DDL for the table: one column per field type, key as primary key, soft-delete stamp when configured.
pub fn create_table(table: &Table) -> Vec<String> {
    let mut col_defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quoted(&c.name), c.sql_type))
        .collect();
    if let Some(col) = &table.soft_delete {
        if table.column(col).is_none() {
            col_defs.push(format!("{} TIMESTAMPTZ", quoted(col)));
        }
    }
    col_defs.push(format!("PRIMARY KEY ({})", quoted(&table.key)));
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&table.schema)),
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table.qualified(),
            col_defs.join(", ")
        ),
    ]
}

fn bind_columns(q: &mut QueryBuf, table: &Table, values: &[(&str, Value)]) -> (Vec<String>, Vec<String>) {
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let val = values
            .iter()
            .find(|(name, _)| *name == c.name)
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null);
        placeholders.push(q.push_param(val, c.sql_type));
        cols.push(quoted(&c.name));
    }
    (cols, placeholders)
}
