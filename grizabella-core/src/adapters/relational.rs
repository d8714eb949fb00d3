//! Relational Adapter (spec §4.2).
//!
//! Persists definitions (three metadata tables) and one physical table per
//! object/relation type. Backed by `rusqlite` with the `bundled` feature; the
//! driver is blocking, so every public method hops to a blocking thread via
//! [`tokio::task::spawn_blocking`] while holding a connection checked out of
//! the pool.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::error::{GrizabellaError, Result};
use crate::pool::{ConnectionFactory, ConnectionPool, PooledConnection};
use crate::types::{
    DefinitionKind, MemoryInstance, ObjectInstance, ObjectTypeDefinition, Property,
    PropertyDataType, PropertyValue, RelationInstance, RelationTypeDefinition,
};

use super::sanitize_identifier;

/// A single equality/comparison predicate over a property or base field,
/// compiled by the Query Planner/Executor into a WHERE clause fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A relational predicate, either a single comparison or an `IN` set
/// membership test, per spec §4.2's `RelationalFilter{property, operator,
/// value}`.
#[derive(Debug, Clone)]
pub enum RelationalFilter {
    Compare {
        property: String,
        operator: CompareOp,
        value: PropertyValue,
    },
    In {
        property: String,
        values: Vec<PropertyValue>,
    },
}

impl RelationalFilter {
    pub fn eq(property: impl Into<String>, value: PropertyValue) -> Self {
        Self::Compare {
            property: property.into(),
            operator: CompareOp::Eq,
            value,
        }
    }

    fn property_name(&self) -> &str {
        match self {
            RelationalFilter::Compare { property, .. } => property,
            RelationalFilter::In { property, .. } => property,
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn canonicalize_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), canonicalize_json(v));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize_json).collect())
        }
        other => other.clone(),
    }
}

fn property_value_to_sql(value: &PropertyValue) -> SqlValue {
    match value {
        PropertyValue::Text(s) => SqlValue::Text(s.clone()),
        PropertyValue::Integer(i) => SqlValue::Integer(*i),
        PropertyValue::Float(f) => SqlValue::Real(*f),
        PropertyValue::Boolean(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        PropertyValue::DateTime(dt) => SqlValue::Text(dt.to_rfc3339()),
        PropertyValue::Blob(b) => SqlValue::Blob(b.clone()),
        PropertyValue::Json(j) => SqlValue::Text(canonicalize_json(j).to_string()),
        PropertyValue::Uuid(u) => SqlValue::Text(u.to_string()),
    }
}

fn sql_to_property_value(data_type: PropertyDataType, value: ValueRef<'_>) -> Result<PropertyValue> {
    if matches!(value, ValueRef::Null) {
        return Err(GrizabellaError::Instance(
            "unexpected NULL for non-null column".to_string(),
        ));
    }
    Ok(match data_type {
        PropertyDataType::Text => PropertyValue::Text(value.as_str()?.to_string()),
        PropertyDataType::Integer => PropertyValue::Integer(value.as_i64()?),
        PropertyDataType::Float => PropertyValue::Float(value.as_f64()?),
        PropertyDataType::Boolean => PropertyValue::Boolean(value.as_i64()? != 0),
        PropertyDataType::DateTime => {
            let text = value.as_str()?;
            let dt = chrono::DateTime::parse_from_rfc3339(text)
                .map_err(|e| GrizabellaError::Instance(format!("invalid datetime '{text}': {e}")))?;
            PropertyValue::DateTime(dt.with_timezone(&chrono::Utc))
        }
        PropertyDataType::Blob => PropertyValue::Blob(value.as_blob()?.to_vec()),
        PropertyDataType::Json => {
            let text = value.as_str()?;
            let parsed: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| GrizabellaError::Instance(format!("invalid JSON column: {e}")))?;
            PropertyValue::Json(parsed)
        }
        PropertyDataType::Uuid => {
            let text = value.as_str()?;
            let uuid = Uuid::parse_str(text)
                .map_err(|e| GrizabellaError::Instance(format!("invalid UUID column '{text}': {e}")))?;
            PropertyValue::Uuid(uuid)
        }
    })
}

fn sql_type_for(data_type: PropertyDataType) -> &'static str {
    match data_type {
        PropertyDataType::Text => "TEXT",
        PropertyDataType::Integer => "INTEGER",
        PropertyDataType::Float => "REAL",
        PropertyDataType::Boolean => "INTEGER",
        PropertyDataType::DateTime => "TEXT",
        PropertyDataType::Blob => "BLOB",
        PropertyDataType::Json => "TEXT",
        PropertyDataType::Uuid => "TEXT",
    }
}

/// Table name for an object type's instance table.
pub fn object_table_name(object_type_name: &str) -> String {
    sanitize_identifier("t_", object_type_name)
}

/// Table name for a relation type's edge property table.
pub fn relation_table_name(relation_type_name: &str) -> String {
    sanitize_identifier("r_", relation_type_name)
}

struct SqliteConnectionFactory {
    path: std::path::PathBuf,
}

#[async_trait::async_trait]
impl ConnectionFactory for SqliteConnectionFactory {
    type Connection = Connection;

    async fn create(&self) -> Result<Connection> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path).map_err(|e| {
                GrizabellaError::Database(format!("failed to open sqlite database {}: {e}", path.display()))
            })?;
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
                .map_err(|e| GrizabellaError::Database(format!("failed to configure sqlite connection: {e}")))?;
            Ok(conn)
        })
        .await
        .map_err(|e| GrizabellaError::Database(format!("sqlite open task panicked: {e}")))?
    }

    async fn is_alive(&self, conn: &Connection) -> bool {
        conn.execute_batch("SELECT 1").is_ok()
    }
}

/// Persists definitions and instance rows for the relational substrate.
pub struct RelationalAdapter {
    pool: Arc<ConnectionPool<SqliteConnectionFactory>>,
}

impl RelationalAdapter {
    /// Open (creating if necessary) the SQLite file at `path` and ensure the
    /// three metadata tables exist.
    pub async fn open(path: &Path, pool_config: &PoolConfig) -> Result<Self> {
        let factory = SqliteConnectionFactory {
            path: path.to_path_buf(),
        };
        let pool = ConnectionPool::new(
            factory,
            pool_config.max_connections_per_type,
            pool_config.max_idle_time,
            pool_config.acquire_timeout,
        );
        let adapter = Self { pool };
        adapter
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS object_types (name TEXT PRIMARY KEY, definition TEXT NOT NULL);
                     CREATE TABLE IF NOT EXISTS relation_types (name TEXT PRIMARY KEY, definition TEXT NOT NULL);
                     CREATE TABLE IF NOT EXISTS embedding_definitions (name TEXT PRIMARY KEY, definition TEXT NOT NULL);",
                )
                .map_err(|e| GrizabellaError::Database(format!("failed to create metadata tables: {e}")))
            })
            .await?;
        Ok(adapter)
    }

    pub async fn stats(&self) -> crate::pool::PoolStats {
        self.pool.stats().await
    }

    /// Evict connections idle past the pool's configured TTL; called by the
    /// Resource Monitor on its sample interval.
    pub async fn evict_idle(&self) {
        self.pool.evict_idle().await;
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    async fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let PooledConnection { connection, bypass } = self.pool.acquire().await?;
        let (connection, result) = tokio::task::spawn_blocking(move || {
            let result = f(&connection);
            (connection, result)
        })
        .await
        .map_err(|e| GrizabellaError::Database(format!("blocking task panicked: {e}")))?;
        self.pool.release(PooledConnection { connection, bypass }).await;
        result
    }

    // ---- Definitions -----------------------------------------------------

    pub async fn save_definition(&self, kind: DefinitionKind, name: &str, json: String) -> Result<()> {
        let table = kind.metadata_table();
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (name, definition) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET definition = excluded.definition"
                ),
                rusqlite::params![name, json],
            )
            .map_err(|e| GrizabellaError::Schema(format!("failed to save definition '{name}': {e}")))?;
            Ok(())
        })
        .await
    }

    pub async fn load_definition(&self, kind: DefinitionKind, name: &str) -> Result<Option<String>> {
        let table = kind.metadata_table();
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT definition FROM {table} WHERE name = ?1"),
                rusqlite::params![name],
                |row| row.get::<_, String>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(GrizabellaError::Database(format!("failed to load definition '{name}': {e}"))),
            })
        })
        .await
    }

    pub async fn delete_definition(&self, kind: DefinitionKind, name: &str) -> Result<()> {
        let table = kind.metadata_table();
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(&format!("DELETE FROM {table} WHERE name = ?1"), rusqlite::params![name])
                .map_err(|e| GrizabellaError::Schema(format!("failed to delete definition '{name}': {e}")))?;
            Ok(())
        })
        .await
    }

    pub async fn list_definitions(&self, kind: DefinitionKind) -> Result<Vec<(String, String)>> {
        let table = kind.metadata_table();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT name, definition FROM {table} ORDER BY name"))
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| GrizabellaError::Database(e.to_string()))?);
            }
            Ok(out)
        })
        .await
    }

    // ---- Table lifecycle ---------------------------------------------------

    /// Idempotently create the instance table for an object type.
    pub async fn create_table(&self, otd: &ObjectTypeDefinition) -> Result<()> {
        let table = object_table_name(&otd.name);
        let sql = build_create_table_sql(&table, &otd.properties);
        let indexes = build_index_sql(&table, &otd.properties);
        self.with_conn(move |conn| {
            conn.execute_batch(&sql)
                .map_err(|e| GrizabellaError::Schema(format!("failed to create table '{table}': {e}")))?;
            for index_sql in &indexes {
                conn.execute_batch(index_sql)
                    .map_err(|e| GrizabellaError::Schema(format!("failed to create index on '{table}': {e}")))?;
            }
            Ok(())
        })
        .await
    }

    /// Idempotently create the edge property table for a relation type that
    /// declares properties of its own.
    pub async fn create_relation_table(&self, rtd: &RelationTypeDefinition) -> Result<()> {
        let table = relation_table_name(&rtd.name);
        let mut properties = rtd.properties.clone();
        properties.push(Property::new("source_object_id", PropertyDataType::Uuid));
        properties.push(Property::new("target_object_id", PropertyDataType::Uuid));
        let sql = build_create_table_sql(&table, &properties);
        self.with_conn(move |conn| {
            conn.execute_batch(&sql)
                .map_err(|e| GrizabellaError::Schema(format!("failed to create relation table '{table}': {e}")))
        })
        .await
    }

    /// Drop the instance table for `name` (an already-sanitized table name),
    /// along with whatever indexes SQLite created for it.
    pub async fn drop_table(&self, table_name: &str) -> Result<()> {
        let table = table_name.to_string();
        self.with_conn(move |conn| {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))
                .map_err(|e| GrizabellaError::Schema(format!("failed to drop table '{table}': {e}")))
        })
        .await
    }

    // ---- Object instance CRUD ---------------------------------------------

    pub async fn upsert_instance(
        &self,
        otd: &ObjectTypeDefinition,
        instance: &ObjectInstance,
    ) -> Result<()> {
        let table = object_table_name(&otd.name);
        let mut columns = vec!["id".to_string(), "weight".to_string(), "upsert_date".to_string()];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string(), "?3".to_string()];
        let mut values: Vec<SqlValue> = vec![
            SqlValue::Text(instance.id().to_string()),
            SqlValue::Real(instance.memory.weight),
            SqlValue::Text(instance.memory.upsert_date.to_rfc3339()),
        ];

        for prop in &otd.properties {
            if prop.is_id() {
                continue;
            }
            if let Some(value) = instance.properties.get(&prop.name) {
                columns.push(quote_ident(&prop.name));
                placeholders.push(format!("?{}", values.len() + 1));
                values.push(property_value_to_sql(value));
            } else if !prop.nullable {
                return Err(GrizabellaError::Instance(format!(
                    "missing required property '{}' on object type '{}'",
                    prop.name, otd.name
                )));
            }
        }

        let update_assignments: Vec<String> = columns
            .iter()
            .skip(1)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO {table} ({cols}) VALUES ({ph})
             ON CONFLICT(id) DO UPDATE SET {upd}",
            cols = columns.join(", "),
            ph = placeholders.join(", "),
            upd = update_assignments.join(", "),
        );

        self.with_conn(move |conn| {
            conn.execute(&sql, rusqlite::params_from_iter(values.iter()))
                .map_err(|e| map_constraint_error(e, &table))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_instance(&self, object_type_name: &str, id: Uuid) -> Result<bool> {
        let table = object_table_name(object_type_name);
        self.with_conn(move |conn| {
            let affected = conn
                .execute(&format!("DELETE FROM {table} WHERE id = ?1"), rusqlite::params![id.to_string()])
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            Ok(affected > 0)
        })
        .await
    }

    pub async fn get_objects_by_ids(
        &self,
        otd: &ObjectTypeDefinition,
        ids: &[Uuid],
    ) -> Result<Vec<ObjectInstance>> {
        let table = object_table_name(&otd.name);
        let otd = otd.clone();
        let mut unique: Vec<Uuid> = ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=unique.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let values: Vec<SqlValue> = unique.iter().map(|id| SqlValue::Text(id.to_string())).collect();
        self.with_conn(move |conn| {
            let sql = format!("SELECT * FROM {table} WHERE id IN ({placeholders})");
            query_rows(conn, &sql, &values, &otd)
        })
        .await
    }

    pub async fn get_all_object_ids_for_type(&self, object_type_name: &str) -> Result<HashSet<Uuid>> {
        let table = object_table_name(object_type_name);
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT id FROM {table}"))
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let mut out = HashSet::new();
            for row in rows {
                let text = row.map_err(|e| GrizabellaError::Database(e.to_string()))?;
                if let Ok(id) = Uuid::parse_str(&text) {
                    out.insert(id);
                }
            }
            Ok(out)
        })
        .await
    }

    pub async fn query_instances(
        &self,
        otd: &ObjectTypeDefinition,
        conditions: &[RelationalFilter],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<ObjectInstance>> {
        let table = object_table_name(&otd.name);
        let otd = otd.clone();
        let (where_clause, values) = build_where_clause(&conditions.to_vec(), 1)?;
        self.with_conn(move |conn| {
            let mut sql = format!("SELECT * FROM {table}");
            if !where_clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&where_clause);
            }
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
            query_rows(conn, &sql, &values, &otd)
        })
        .await
    }

    pub async fn find_object_ids_by_properties(
        &self,
        object_type_name: &str,
        filters: &[RelationalFilter],
        initial_ids: Option<&HashSet<Uuid>>,
    ) -> Result<HashSet<Uuid>> {
        let table = object_table_name(object_type_name);
        let (mut where_clause, mut values) = build_where_clause(&filters.to_vec(), 1)?;
        if let Some(ids) = initial_ids {
            if ids.is_empty() {
                return Ok(HashSet::new());
            }
            let start = values.len() + 1;
            let placeholders = (0..ids.len()).map(|i| format!("?{}", start + i)).collect::<Vec<_>>().join(", ");
            if !where_clause.is_empty() {
                where_clause.push_str(" AND ");
            }
            where_clause.push_str(&format!("id IN ({placeholders})"));
            values.extend(ids.iter().map(|id| SqlValue::Text(id.to_string())));
        }
        self.with_conn(move |conn| {
            let mut sql = format!("SELECT id FROM {table}");
            if !where_clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&where_clause);
            }
            let mut stmt = conn.prepare(&sql).map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(values.iter()), |row| row.get::<_, String>(0))
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            let mut out = HashSet::new();
            for row in rows {
                let text = row.map_err(|e| GrizabellaError::Database(e.to_string()))?;
                if let Ok(id) = Uuid::parse_str(&text) {
                    out.insert(id);
                }
            }
            Ok(out)
        })
        .await
    }

    // ---- Relation instance CRUD (only for RTDs with properties) ----------

    pub async fn upsert_relation_row(&self, rtd: &RelationTypeDefinition, instance: &RelationInstance) -> Result<()> {
        let table = relation_table_name(&rtd.name);
        let mut columns = vec![
            "id".to_string(),
            "weight".to_string(),
            "upsert_date".to_string(),
            "source_object_id".to_string(),
            "target_object_id".to_string(),
        ];
        let mut values: Vec<SqlValue> = vec![
            SqlValue::Text(instance.id().to_string()),
            SqlValue::Real(instance.memory.weight),
            SqlValue::Text(instance.memory.upsert_date.to_rfc3339()),
            SqlValue::Text(instance.source_object_id.to_string()),
            SqlValue::Text(instance.target_object_id.to_string()),
        ];
        for prop in &rtd.properties {
            if let Some(value) = instance.properties.get(&prop.name) {
                columns.push(quote_ident(&prop.name));
                values.push(property_value_to_sql(value));
            } else if !prop.nullable {
                return Err(GrizabellaError::Instance(format!(
                    "missing required property '{}' on relation type '{}'",
                    prop.name, rtd.name
                )));
            }
        }
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let update_assignments: Vec<String> = columns
            .iter()
            .skip(1)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO {table} ({cols}) VALUES ({ph})
             ON CONFLICT(id) DO UPDATE SET {upd}",
            cols = columns.join(", "),
            ph = placeholders.join(", "),
            upd = update_assignments.join(", "),
        );
        self.with_conn(move |conn| {
            conn.execute(&sql, rusqlite::params_from_iter(values.iter()))
                .map_err(|e| map_constraint_error(e, &table))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_relation_row(&self, relation_type_name: &str, id: Uuid) -> Result<bool> {
        let table = relation_table_name(relation_type_name);
        self.with_conn(move |conn| {
            let affected = conn
                .execute(&format!("DELETE FROM {table} WHERE id = ?1"), rusqlite::params![id.to_string()])
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            Ok(affected > 0)
        })
        .await
    }
}

fn map_constraint_error(err: rusqlite::Error, table: &str) -> GrizabellaError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            GrizabellaError::Instance(format!("constraint violation on '{table}': {msg}"))
        }
        _ => GrizabellaError::Database(format!("sqlite error on '{table}': {err}")),
    }
}

fn build_create_table_sql(table: &str, properties: &[Property]) -> String {
    let mut columns = vec![
        "id TEXT PRIMARY KEY".to_string(),
        "weight REAL NOT NULL".to_string(),
        "upsert_date TEXT NOT NULL".to_string(),
    ];
    for prop in properties {
        if prop.is_id() {
            continue;
        }
        let mut col = format!("{} {}", quote_ident(&prop.name), sql_type_for(prop.data_type));
        if !prop.nullable {
            col.push_str(" NOT NULL");
        }
        if prop.unique {
            col.push_str(" UNIQUE");
        }
        columns.push(col);
    }
    format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", "))
}

fn build_index_sql(table: &str, properties: &[Property]) -> Vec<String> {
    properties
        .iter()
        .filter(|p| p.indexed && !p.is_id())
        .map(|p| {
            let index_name = format!("idx_{table}_{}", sanitize_identifier("", &p.name));
            format!("CREATE INDEX IF NOT EXISTS {index_name} ON {table} ({})", quote_ident(&p.name))
        })
        .collect()
}

fn build_where_clause(conditions: &[RelationalFilter], start: usize) -> Result<(String, Vec<SqlValue>)> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    let mut next = start;
    for cond in conditions {
        match cond {
            RelationalFilter::Compare { property, operator, value } => {
                clauses.push(format!("{} {} ?{}", quote_ident(property), operator.sql(), next));
                values.push(property_value_to_sql(value));
                next += 1;
            }
            RelationalFilter::In { property, values: set } => {
                if set.is_empty() {
                    // An empty IN-set can never match; short-circuit the
                    // whole clause to an always-false predicate.
                    clauses.push("0".to_string());
                    continue;
                }
                let placeholders: Vec<String> = (0..set.len()).map(|i| format!("?{}", next + i)).collect();
                clauses.push(format!("{} IN ({})", quote_ident(property), placeholders.join(", ")));
                next += set.len();
                values.extend(set.iter().map(property_value_to_sql));
            }
        }
    }
    Ok((clauses.join(" AND "), values))
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    values: &[SqlValue],
    otd: &ObjectTypeDefinition,
) -> Result<Vec<ObjectInstance>> {
    let mut stmt = conn.prepare(sql).map_err(|e| GrizabellaError::Database(e.to_string()))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let type_by_column: HashMap<String, PropertyDataType> = otd
        .properties
        .iter()
        .filter(|p| !p.is_id())
        .map(|p| (p.name.clone(), p.data_type))
        .collect();

    let mut rows = stmt
        .query(rusqlite::params_from_iter(values.iter()))
        .map_err(|e| GrizabellaError::Database(e.to_string()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| GrizabellaError::Database(e.to_string()))? {
        let id_text: String = row.get("id").map_err(|e| GrizabellaError::Database(e.to_string()))?;
        let id = Uuid::parse_str(&id_text)
            .map_err(|e| GrizabellaError::Instance(format!("invalid id column '{id_text}': {e}")))?;
        let weight: f64 = row.get("weight").map_err(|e| GrizabellaError::Database(e.to_string()))?;
        let upsert_date_text: String = row.get("upsert_date").map_err(|e| GrizabellaError::Database(e.to_string()))?;
        let upsert_date = chrono::DateTime::parse_from_rfc3339(&upsert_date_text)
            .map_err(|e| GrizabellaError::Instance(format!("invalid upsert_date: {e}")))?
            .with_timezone(&chrono::Utc);

        let mut properties = HashMap::new();
        for column in &column_names {
            if column == "id" || column == "weight" || column == "upsert_date" {
                continue;
            }
            if let Some(data_type) = type_by_column.get(column) {
                let value_ref = row.get_ref(column.as_str()).map_err(|e| GrizabellaError::Database(e.to_string()))?;
                if matches!(value_ref, ValueRef::Null) {
                    continue;
                }
                properties.insert(column.clone(), sql_to_property_value(*data_type, value_ref)?);
            }
        }

        out.push(ObjectInstance {
            memory: MemoryInstance { id, weight, upsert_date },
            object_type_name: otd.name.clone(),
            properties,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyDataType;

    fn book_otd() -> ObjectTypeDefinition {
        ObjectTypeDefinition::new(
            "Book",
            vec![
                Property::new("title", PropertyDataType::Text).unique().indexed(),
                Property::new("year", PropertyDataType::Integer).nullable(),
            ],
        )
    }

    async fn open_adapter() -> (RelationalAdapter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default())
            .await
            .unwrap();
        (adapter, dir)
    }

    #[tokio::test]
    async fn definitions_round_trip() {
        let (adapter, _dir) = open_adapter().await;
        adapter
            .save_definition(DefinitionKind::ObjectType, "Book", "{\"name\":\"Book\"}".to_string())
            .await
            .unwrap();
        let loaded = adapter.load_definition(DefinitionKind::ObjectType, "Book").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("{\"name\":\"Book\"}"));
        adapter.delete_definition(DefinitionKind::ObjectType, "Book").await.unwrap();
        assert!(adapter.load_definition(DefinitionKind::ObjectType, "Book").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_query_and_delete_instance() {
        let (adapter, _dir) = open_adapter().await;
        let otd = book_otd();
        adapter.create_table(&otd).await.unwrap();

        let instance = ObjectInstance::new("Book")
            .with_property("title", PropertyValue::Text("1984".to_string()))
            .with_property("year", PropertyValue::Integer(1949));
        adapter.upsert_instance(&otd, &instance).await.unwrap();

        let found = adapter
            .query_instances(&otd, &[RelationalFilter::eq("title", PropertyValue::Text("1984".to_string()))], None, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), instance.id());

        let ids = adapter.get_all_object_ids_for_type("Book").await.unwrap();
        assert!(ids.contains(&instance.id()));

        let deleted = adapter.delete_instance("Book", instance.id()).await.unwrap();
        assert!(deleted);
        let deleted_again = adapter.delete_instance("Book", instance.id()).await.unwrap();
        assert!(!deleted_again);
    }

    #[tokio::test]
    async fn unique_constraint_violation_surfaces_as_instance_error() {
        let (adapter, _dir) = open_adapter().await;
        let otd = book_otd();
        adapter.create_table(&otd).await.unwrap();

        let a = ObjectInstance::new("Book").with_property("title", PropertyValue::Text("Dup".to_string()));
        let b = ObjectInstance::new("Book").with_property("title", PropertyValue::Text("Dup".to_string()));
        adapter.upsert_instance(&otd, &a).await.unwrap();
        let err = adapter.upsert_instance(&otd, &b).await.unwrap_err();
        assert!(matches!(err, GrizabellaError::Instance(_)));
    }

    #[tokio::test]
    async fn get_objects_by_ids_dedupes_and_drops_missing() {
        let (adapter, _dir) = open_adapter().await;
        let otd = book_otd();
        adapter.create_table(&otd).await.unwrap();
        let a = ObjectInstance::new("Book").with_property("title", PropertyValue::Text("A".to_string()));
        adapter.upsert_instance(&otd, &a).await.unwrap();

        let missing = Uuid::new_v4();
        let found = adapter
            .get_objects_by_ids(&otd, &[a.id(), a.id(), missing])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
