//! Graph Adapter (spec §4.4).
//!
//! One node table per OTD (primary key `id: UUID`), one edge table per RTD.
//! `kuzu::Connection` is not `Send`, so every query runs through the
//! [`ThreadSafeGraphHandle`] worker thread rather than touching the driver
//! from async code directly.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{GrizabellaError, Result};
use crate::pool::ThreadSafeGraphHandle;
use crate::types::{
    ObjectInstance, ObjectTypeDefinition, Property, PropertyDataType, PropertyValue,
    RelationInstance, RelationTypeDefinition,
};

use super::relational::CompareOp;
use super::sanitize_identifier;

/// Table name for an object type's node table.
pub fn node_table_name(object_type_name: &str) -> String {
    sanitize_identifier("n_", object_type_name)
}

/// Table name for a relation type's edge table.
pub fn rel_table_name(relation_type_name: &str) -> String {
    sanitize_identifier("e_", relation_type_name)
}

/// Which end of a relation a traversal clause walks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A predicate over a target node's properties, reusing the comparison
/// vocabulary of the Relational Adapter's filters.
#[derive(Debug, Clone)]
pub struct GraphPropertyFilter {
    pub property: String,
    pub operator: CompareOp,
    pub value: PropertyValue,
}

/// A declarative traversal step: filter source ids by the presence of a
/// matching typed edge to a target node (spec §4.4, §Glossary).
#[derive(Debug, Clone)]
pub struct GraphTraversalClause {
    pub relation_type: String,
    pub direction: Direction,
    pub target_type: String,
    pub target_object_id: Option<Uuid>,
    pub target_object_properties: Vec<GraphPropertyFilter>,
}

fn cypher_type_for(data_type: PropertyDataType) -> &'static str {
    match data_type {
        PropertyDataType::Text => "STRING",
        PropertyDataType::Integer => "INT64",
        PropertyDataType::Float => "DOUBLE",
        PropertyDataType::Boolean => "BOOL",
        PropertyDataType::DateTime => "TIMESTAMP",
        PropertyDataType::Blob => "BLOB",
        PropertyDataType::Json => "STRING",
        PropertyDataType::Uuid => "UUID",
    }
}

fn cypher_op(op: &CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

fn property_value_to_kuzu(value: &PropertyValue) -> kuzu::Value {
    match value {
        PropertyValue::Text(s) => kuzu::Value::String(s.clone()),
        PropertyValue::Integer(i) => kuzu::Value::Int64(*i),
        PropertyValue::Float(f) => kuzu::Value::Double(*f),
        PropertyValue::Boolean(b) => kuzu::Value::Bool(*b),
        PropertyValue::DateTime(dt) => kuzu::Value::Timestamp(*dt),
        PropertyValue::Blob(b) => kuzu::Value::Blob(b.clone()),
        PropertyValue::Json(j) => kuzu::Value::String(j.to_string()),
        PropertyValue::Uuid(u) => kuzu::Value::UUID(*u),
    }
}

fn kuzu_value_to_property(data_type: PropertyDataType, value: &kuzu::Value) -> Result<PropertyValue> {
    Ok(match (data_type, value) {
        (PropertyDataType::Text, kuzu::Value::String(s)) => PropertyValue::Text(s.clone()),
        (PropertyDataType::Integer, kuzu::Value::Int64(i)) => PropertyValue::Integer(*i),
        (PropertyDataType::Float, kuzu::Value::Double(f)) => PropertyValue::Float(*f),
        (PropertyDataType::Boolean, kuzu::Value::Bool(b)) => PropertyValue::Boolean(*b),
        (PropertyDataType::DateTime, kuzu::Value::Timestamp(dt)) => PropertyValue::DateTime(*dt),
        (PropertyDataType::Blob, kuzu::Value::Blob(b)) => PropertyValue::Blob(b.clone()),
        (PropertyDataType::Json, kuzu::Value::String(s)) => {
            let parsed = serde_json::from_str(s)
                .map_err(|e| GrizabellaError::Instance(format!("invalid JSON node property: {e}")))?;
            PropertyValue::Json(parsed)
        }
        (PropertyDataType::Uuid, kuzu::Value::UUID(u)) => PropertyValue::Uuid(*u),
        _ => {
            return Err(GrizabellaError::Database(
                "graph column value did not match its declared property type".to_string(),
            ))
        }
    })
}

fn node_property_defs(properties: &[Property]) -> Vec<String> {
    properties
        .iter()
        .filter(|p| !p.is_id())
        .map(|p| format!("{} {}", p.name, cypher_type_for(p.data_type)))
        .collect()
}

/// Persists node/edge tables and runs typed traversal queries.
pub struct GraphAdapter {
    handle: ThreadSafeGraphHandle,
}

impl GraphAdapter {
    pub fn new(handle: ThreadSafeGraphHandle) -> Self {
        Self { handle }
    }

    async fn run_ddl(&self, query: String) -> Result<()> {
        self.handle
            .run(move |conn| {
                conn.query(&query)
                    .map(|_| ())
                    .map_err(|e| GrizabellaError::Schema(format!("graph DDL failed: {e}")))
            })
            .await
    }

    /// Requires an explicit `id` property (if present) to be UUID-typed.
    pub async fn create_node_table(&self, otd: &ObjectTypeDefinition) -> Result<()> {
        if let Some(id_prop) = otd.property("id") {
            if id_prop.data_type != PropertyDataType::Uuid {
                return Err(GrizabellaError::Schema(format!(
                    "object type '{}' declares a non-UUID 'id' property",
                    otd.name
                )));
            }
        }
        let table = node_table_name(&otd.name);
        let mut columns = vec!["id UUID".to_string()];
        columns.push("weight DOUBLE".to_string());
        columns.push("upsert_date TIMESTAMP".to_string());
        columns.extend(node_property_defs(&otd.properties));
        let query = format!("CREATE NODE TABLE IF NOT EXISTS {table} ({}, PRIMARY KEY (id))", columns.join(", "));
        self.run_ddl(query).await
    }

    /// Requires both endpoint node tables to already exist.
    pub async fn create_rel_table(&self, rtd: &RelationTypeDefinition) -> Result<()> {
        let table = rel_table_name(&rtd.name);
        let mut from_to = Vec::new();
        for source in &rtd.source_otds {
            for target in &rtd.target_otds {
                from_to.push(format!("FROM {} TO {}", node_table_name(source), node_table_name(target)));
            }
        }
        let mut columns = vec!["id UUID".to_string(), "weight DOUBLE".to_string(), "upsert_date TIMESTAMP".to_string()];
        columns.extend(node_property_defs(&rtd.properties));

        let query = if from_to.len() <= 1 {
            format!(
                "CREATE REL TABLE IF NOT EXISTS {table} ({}, {})",
                from_to.first().cloned().unwrap_or_default(),
                columns.join(", ")
            )
        } else {
            format!("CREATE REL TABLE GROUP IF NOT EXISTS {table} ({}, {})", from_to.join(", "), columns.join(", "))
        };
        self.run_ddl(query).await
    }

    pub async fn drop_node_table(&self, object_type_name: &str) -> Result<()> {
        let table = node_table_name(object_type_name);
        self.run_ddl(format!("DROP TABLE IF EXISTS {table}")).await
    }

    pub async fn drop_rel_table(&self, relation_type_name: &str) -> Result<()> {
        let table = rel_table_name(relation_type_name);
        self.run_ddl(format!("DROP TABLE IF EXISTS {table}")).await
    }

    /// MERGE by id; `SET` identically on create and match.
    pub async fn upsert_object_instance(&self, otd: &ObjectTypeDefinition, instance: &ObjectInstance) -> Result<()> {
        let table = node_table_name(&otd.name);
        let mut set_clauses = vec!["n.weight = $weight".to_string(), "n.upsert_date = $upsert_date".to_string()];
        let mut params: Vec<(String, kuzu::Value)> = vec![
            ("id".to_string(), kuzu::Value::UUID(instance.id())),
            ("weight".to_string(), kuzu::Value::Double(instance.memory.weight)),
            ("upsert_date".to_string(), kuzu::Value::Timestamp(instance.memory.upsert_date)),
        ];
        for prop in &otd.properties {
            if prop.is_id() {
                continue;
            }
            if let Some(value) = instance.properties.get(&prop.name) {
                set_clauses.push(format!("n.{0} = ${0}", prop.name));
                params.push((prop.name.clone(), property_value_to_kuzu(value)));
            }
        }
        let query = format!(
            "MERGE (n:{table} {{id: $id}}) ON CREATE SET {set} ON MATCH SET {set}",
            set = set_clauses.join(", ")
        );
        self.handle
            .run(move |conn| run_merge(conn, &query, params))
            .await
    }

    pub async fn get_object_instance(&self, otd: &ObjectTypeDefinition, id: Uuid) -> Result<Option<ObjectInstance>> {
        let table = node_table_name(&otd.name);
        let otd = otd.clone();
        let query = format!("MATCH (n:{table} {{id: $id}}) RETURN n");
        self.handle
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&query)
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut result = conn
                    .execute(&mut stmt, vec![("id", kuzu::Value::UUID(id))])
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                match result.next() {
                    Some(row) => Ok(Some(row_to_object_instance(&row, &otd)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    /// DETACH DELETE (removes incident edges); returns whether any node was
    /// deleted.
    pub async fn delete_object_instance(&self, object_type_name: &str, id: Uuid) -> Result<bool> {
        let table = node_table_name(object_type_name);
        let query = format!("MATCH (n:{table} {{id: $id}}) DETACH DELETE n RETURN COUNT(n)");
        self.handle
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&query)
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut result = conn
                    .execute(&mut stmt, vec![("id", kuzu::Value::UUID(id))])
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let deleted = match result.next() {
                    Some(row) => matches!(row.first(), Some(kuzu::Value::Int64(n)) if *n > 0),
                    None => false,
                };
                Ok(deleted)
            })
            .await
    }

    /// MERGE edge by id between the matched endpoints.
    pub async fn upsert_relation_instance(
        &self,
        rtd: &RelationTypeDefinition,
        source_type: &str,
        target_type: &str,
        instance: &RelationInstance,
    ) -> Result<()> {
        let rel_table = rel_table_name(&rtd.name);
        let source_table = node_table_name(source_type);
        let target_table = node_table_name(target_type);

        let mut set_clauses = vec!["e.weight = $weight".to_string(), "e.upsert_date = $upsert_date".to_string()];
        let mut params: Vec<(String, kuzu::Value)> = vec![
            ("rel_id".to_string(), kuzu::Value::UUID(instance.id())),
            ("source_id".to_string(), kuzu::Value::UUID(instance.source_object_id)),
            ("target_id".to_string(), kuzu::Value::UUID(instance.target_object_id)),
            ("weight".to_string(), kuzu::Value::Double(instance.memory.weight)),
            ("upsert_date".to_string(), kuzu::Value::Timestamp(instance.memory.upsert_date)),
        ];
        for prop in &rtd.properties {
            if let Some(value) = instance.properties.get(&prop.name) {
                set_clauses.push(format!("e.{0} = ${0}", prop.name));
                params.push((prop.name.clone(), property_value_to_kuzu(value)));
            }
        }

        let query = format!(
            "MATCH (s:{source_table} {{id: $source_id}}), (t:{target_table} {{id: $target_id}})
             MERGE (s)-[e:{rel_table} {{id: $rel_id}}]->(t)
             ON CREATE SET {set} ON MATCH SET {set}",
            set = set_clauses.join(", ")
        );
        self.handle.run(move |conn| run_merge(conn, &query, params)).await
    }

    pub async fn get_relation_instance(&self, relation_type_name: &str, id: Uuid) -> Result<Option<RelationInstance>> {
        let rel_table = rel_table_name(relation_type_name);
        let relation_type_name = relation_type_name.to_string();
        let query = format!("MATCH (s)-[e:{rel_table} {{id: $id}}]->(t) RETURN e, s.id, t.id");
        self.handle
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&query)
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut result = conn
                    .execute(&mut stmt, vec![("id", kuzu::Value::UUID(id))])
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                match result.next() {
                    Some(row) => Ok(Some(row_to_relation_instance(&row, &relation_type_name)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn delete_relation_instance(&self, relation_type_name: &str, id: Uuid) -> Result<bool> {
        let rel_table = rel_table_name(relation_type_name);
        let query = format!("MATCH (s)-[e:{rel_table} {{id: $id}}]->(t) DELETE e RETURN COUNT(e)");
        self.handle
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&query)
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut result = conn
                    .execute(&mut stmt, vec![("id", kuzu::Value::UUID(id))])
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let deleted = match result.next() {
                    Some(row) => matches!(row.first(), Some(kuzu::Value::Int64(n)) if *n > 0),
                    None => false,
                };
                Ok(deleted)
            })
            .await
    }

    /// Requires `type` when `props`, `source_id`, or `target_id` is
    /// provided; with none of those, returns `[]` without touching the
    /// substrate.
    pub async fn find_relation_instances(
        &self,
        relation_type_name: Option<&str>,
        source_id: Option<Uuid>,
        target_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<Vec<RelationInstance>> {
        let Some(relation_type_name) = relation_type_name else {
            if source_id.is_some() || target_id.is_some() {
                return Err(GrizabellaError::Validation(
                    "find_relation_instances requires a relation type when endpoints are given".to_string(),
                ));
            }
            return Ok(Vec::new());
        };
        let rel_table = rel_table_name(relation_type_name);
        let relation_type_name = relation_type_name.to_string();
        let mut conditions = Vec::new();
        let mut params: Vec<(String, kuzu::Value)> = Vec::new();
        if let Some(source_id) = source_id {
            conditions.push("s.id = $source_id".to_string());
            params.push(("source_id".to_string(), kuzu::Value::UUID(source_id)));
        }
        if let Some(target_id) = target_id {
            conditions.push("t.id = $target_id".to_string());
            params.push(("target_id".to_string(), kuzu::Value::UUID(target_id)));
        }
        let mut query = format!("MATCH (s)-[e:{rel_table}]->(t)");
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" RETURN e, s.id, t.id");
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        self.handle
            .run(move |conn| {
                let mut stmt = conn.prepare(&query).map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let params_ref: Vec<(&str, kuzu::Value)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
                let result = conn
                    .execute(&mut stmt, params_ref)
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut out = Vec::new();
                for row in result {
                    out.push(row_to_relation_instance(&row, &relation_type_name)?);
                }
                Ok(out)
            })
            .await
    }

    /// Subset of `source_ids` connected to at least one id in `target_ids` by
    /// a `relation_type` edge in `direction`. Used by the Query Executor to
    /// bridge a `LogicalGroup`'s children when they name different object
    /// types (spec §4.8/§4.9, §8 scenario 3): rather than intersecting ids
    /// across disjoint type spaces, the non-primary child's ids are first
    /// projected into the primary type's id space through the relation that
    /// connects the two types.
    pub async fn bridge_ids_by_target_set(
        &self,
        source_type: &str,
        source_ids: &HashSet<Uuid>,
        relation_type: &str,
        direction: Direction,
        target_type: &str,
        target_ids: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        if source_ids.is_empty() || target_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let source_table = node_table_name(source_type);
        let target_table = node_table_name(target_type);
        let rel_table = rel_table_name(relation_type);
        let pattern = match direction {
            Direction::Outgoing => format!("(s:{source_table})-[:{rel_table}]->(t:{target_table})"),
            Direction::Incoming => format!("(s:{source_table})<-[:{rel_table}]-(t:{target_table})"),
        };
        let source_list = source_ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
        let target_list = target_ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
        let query =
            format!("MATCH {pattern} WHERE s.id IN [{source_list}] AND t.id IN [{target_list}] RETURN DISTINCT s.id");

        self.handle
            .run(move |conn| {
                let mut stmt = conn.prepare(&query).map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let result = conn
                    .execute(&mut stmt, Vec::<(&str, kuzu::Value)>::new())
                    .map_err(|e| GrizabellaError::Database(e.to_string()))?;
                let mut out = HashSet::new();
                for row in result {
                    if let Some(kuzu::Value::UUID(id)) = row.first() {
                        out.insert(*id);
                    }
                }
                Ok(out)
            })
            .await
    }

    /// Central graph-query primitive: a source id qualifies iff for every
    /// clause there exists at least one matching path. Clauses compose by
    /// intersection.
    pub async fn filter_object_ids_by_relations(
        &self,
        source_type: &str,
        initial_ids: &HashSet<Uuid>,
        traversals: &[GraphTraversalClause],
    ) -> Result<HashSet<Uuid>> {
        if initial_ids.is_empty() || traversals.is_empty() {
            return Ok(initial_ids.clone());
        }
        let source_table = node_table_name(source_type);
        let ids: Vec<Uuid> = initial_ids.iter().copied().collect();
        let traversals = traversals.to_vec();

        self.handle
            .run(move |conn| {
                let mut surviving: HashSet<Uuid> = ids.iter().copied().collect();
                for clause in &traversals {
                    let rel_table = rel_table_name(&clause.relation_type);
                    let target_table = node_table_name(&clause.target_type);
                    let pattern = match clause.direction {
                        Direction::Outgoing => format!("(s:{source_table})-[:{rel_table}]->(t:{target_table})"),
                        Direction::Incoming => format!("(s:{source_table})<-[:{rel_table}]-(t:{target_table})"),
                    };
                    let mut conditions = Vec::new();
                    let mut params: Vec<(String, kuzu::Value)> = Vec::new();
                    if let Some(target_id) = clause.target_object_id {
                        conditions.push("t.id = $target_id".to_string());
                        params.push(("target_id".to_string(), kuzu::Value::UUID(target_id)));
                    }
                    for (i, filter) in clause.target_object_properties.iter().enumerate() {
                        let param_name = format!("tp{i}");
                        conditions.push(format!("t.{} {} ${param_name}", filter.property, cypher_op(&filter.operator)));
                        params.push((param_name, property_value_to_kuzu(&filter.value)));
                    }

                    let id_list = surviving.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
                    conditions.push(format!("s.id IN [{id_list}]"));

                    let query = format!(
                        "MATCH {pattern} WHERE {} RETURN DISTINCT s.id",
                        conditions.join(" AND ")
                    );
                    let mut stmt = conn.prepare(&query).map_err(|e| GrizabellaError::Database(e.to_string()))?;
                    let params_ref: Vec<(&str, kuzu::Value)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
                    let result = conn
                        .execute(&mut stmt, params_ref)
                        .map_err(|e| GrizabellaError::Database(e.to_string()))?;

                    let mut matched = HashSet::new();
                    for row in result {
                        if let Some(kuzu::Value::UUID(id)) = row.first() {
                            matched.insert(*id);
                        }
                    }
                    surviving = surviving.intersection(&matched).copied().collect();
                    if surviving.is_empty() {
                        break;
                    }
                }
                Ok(surviving)
            })
            .await
    }
}

fn run_merge(conn: &kuzu::Connection, query: &str, params: Vec<(String, kuzu::Value)>) -> Result<()> {
    let mut stmt = conn.prepare(query).map_err(|e| GrizabellaError::Database(e.to_string()))?;
    let params_ref: Vec<(&str, kuzu::Value)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    conn.execute(&mut stmt, params_ref)
        .map_err(|e| GrizabellaError::Database(format!("graph merge failed: {e}")))?;
    Ok(())
}

fn row_to_object_instance(row: &[kuzu::Value], otd: &ObjectTypeDefinition) -> Result<ObjectInstance> {
    let kuzu::Value::Node(node) = &row[0] else {
        return Err(GrizabellaError::Database("expected a node value in query result".to_string()));
    };
    let id = node
        .get("id")
        .and_then(|v| if let kuzu::Value::UUID(u) = v { Some(*u) } else { None })
        .ok_or_else(|| GrizabellaError::Database("node missing id property".to_string()))?;
    let weight = node
        .get("weight")
        .and_then(|v| if let kuzu::Value::Double(d) = v { Some(*d) } else { None })
        .unwrap_or(1.0);
    let upsert_date = node
        .get("upsert_date")
        .and_then(|v| if let kuzu::Value::Timestamp(t) = v { Some(*t) } else { None })
        .unwrap_or_else(chrono::Utc::now);

    let mut properties = std::collections::HashMap::new();
    for prop in &otd.properties {
        if prop.is_id() {
            continue;
        }
        if let Some(value) = node.get(&prop.name) {
            properties.insert(prop.name.clone(), kuzu_value_to_property(prop.data_type, value)?);
        }
    }

    Ok(ObjectInstance {
        memory: crate::types::MemoryInstance { id, weight, upsert_date },
        object_type_name: otd.name.clone(),
        properties,
    })
}

fn row_to_relation_instance(row: &[kuzu::Value], relation_type_name: &str) -> Result<RelationInstance> {
    let kuzu::Value::Rel(edge) = &row[0] else {
        return Err(GrizabellaError::Database("expected a relationship value in query result".to_string()));
    };
    let id = edge
        .get("id")
        .and_then(|v| if let kuzu::Value::UUID(u) = v { Some(*u) } else { None })
        .ok_or_else(|| GrizabellaError::Database("edge missing id property".to_string()))?;
    let weight = edge
        .get("weight")
        .and_then(|v| if let kuzu::Value::Double(d) = v { Some(*d) } else { None })
        .unwrap_or(1.0);
    let upsert_date = edge
        .get("upsert_date")
        .and_then(|v| if let kuzu::Value::Timestamp(t) = v { Some(*t) } else { None })
        .unwrap_or_else(chrono::Utc::now);

    let source_object_id = match &row[1] {
        kuzu::Value::UUID(u) => *u,
        _ => return Err(GrizabellaError::Database("expected source id in query result".to_string())),
    };
    let target_object_id = match &row[2] {
        kuzu::Value::UUID(u) => *u,
        _ => return Err(GrizabellaError::Database("expected target id in query result".to_string())),
    };

    let mut properties = std::collections::HashMap::new();
    for (key, value) in edge.properties() {
        if matches!(key.as_str(), "id" | "weight" | "upsert_date") {
            continue;
        }
        if let Ok(pv) = kuzu_value_from_untyped(value) {
            properties.insert(key.clone(), pv);
        }
    }

    Ok(RelationInstance {
        memory: crate::types::MemoryInstance { id, weight, upsert_date },
        relation_type_name: relation_type_name.to_string(),
        source_object_id,
        target_object_id,
        properties,
    })
}

/// Best-effort conversion for edge properties whose declared type isn't
/// known at this call site (the RTD isn't threaded through row decoding);
/// infers the `PropertyValue` variant from the `kuzu::Value` tag itself.
fn kuzu_value_from_untyped(value: &kuzu::Value) -> Result<PropertyValue> {
    Ok(match value {
        kuzu::Value::String(s) => PropertyValue::Text(s.clone()),
        kuzu::Value::Int64(i) => PropertyValue::Integer(*i),
        kuzu::Value::Double(f) => PropertyValue::Float(*f),
        kuzu::Value::Bool(b) => PropertyValue::Boolean(*b),
        kuzu::Value::Timestamp(dt) => PropertyValue::DateTime(*dt),
        kuzu::Value::Blob(b) => PropertyValue::Blob(b.clone()),
        kuzu::Value::UUID(u) => PropertyValue::Uuid(*u),
        _ => return Err(GrizabellaError::Database("unsupported graph property value".to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryInstance, Property, PropertyDataType};

    async fn test_adapter() -> (GraphAdapter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let graph_dir = dir.path().join("kuzu_data");
        std::fs::create_dir_all(&graph_dir).unwrap();
        let handle = ThreadSafeGraphHandle::open(&graph_dir).unwrap();
        (GraphAdapter::new(handle), dir)
    }

    #[tokio::test]
    async fn delete_object_instance_reports_whether_a_node_matched() {
        let (adapter, _dir) = test_adapter().await;
        let otd = ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]);
        adapter.create_node_table(&otd).await.unwrap();

        assert!(!adapter.delete_object_instance("Book", Uuid::new_v4()).await.unwrap());

        let instance = ObjectInstance {
            memory: MemoryInstance { id: Uuid::new_v4(), weight: 1.0, upsert_date: chrono::Utc::now() },
            object_type_name: "Book".to_string(),
            properties: std::collections::HashMap::new(),
        };
        adapter.upsert_object_instance(&otd, &instance).await.unwrap();
        assert!(adapter.delete_object_instance("Book", instance.id()).await.unwrap());
        assert!(!adapter.delete_object_instance("Book", instance.id()).await.unwrap());
    }

    #[tokio::test]
    async fn delete_relation_instance_reports_whether_an_edge_matched() {
        let (adapter, _dir) = test_adapter().await;
        let book = ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]);
        let author = ObjectTypeDefinition::new("Author", vec![Property::new("name", PropertyDataType::Text)]);
        adapter.create_node_table(&book).await.unwrap();
        adapter.create_node_table(&author).await.unwrap();
        let rtd = RelationTypeDefinition::new("WRITTEN_BY", vec!["Book".to_string()], vec!["Author".to_string()]);
        adapter.create_rel_table(&rtd).await.unwrap();

        assert!(!adapter.delete_relation_instance("WRITTEN_BY", Uuid::new_v4()).await.unwrap());

        let book_instance = ObjectInstance {
            memory: MemoryInstance { id: Uuid::new_v4(), weight: 1.0, upsert_date: chrono::Utc::now() },
            object_type_name: "Book".to_string(),
            properties: std::collections::HashMap::new(),
        };
        let author_instance = ObjectInstance {
            memory: MemoryInstance { id: Uuid::new_v4(), weight: 1.0, upsert_date: chrono::Utc::now() },
            object_type_name: "Author".to_string(),
            properties: std::collections::HashMap::new(),
        };
        adapter.upsert_object_instance(&book, &book_instance).await.unwrap();
        adapter.upsert_object_instance(&author, &author_instance).await.unwrap();

        let relation = RelationInstance {
            memory: MemoryInstance { id: Uuid::new_v4(), weight: 1.0, upsert_date: chrono::Utc::now() },
            relation_type_name: "WRITTEN_BY".to_string(),
            source_object_id: book_instance.id(),
            target_object_id: author_instance.id(),
            properties: std::collections::HashMap::new(),
        };
        adapter.upsert_relation_instance(&rtd, "Book", "Author", &relation).await.unwrap();
        assert!(adapter.delete_relation_instance("WRITTEN_BY", relation.id()).await.unwrap());
        assert!(!adapter.delete_relation_instance("WRITTEN_BY", relation.id()).await.unwrap());
    }
}
