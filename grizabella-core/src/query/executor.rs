//! Query Executor (spec §4.9).
//!
//! Walks a planned clause tree bottom-up, composing per-component id sets by
//! Boolean set algebra, and materializes the survivors of the root into full
//! `ObjectInstance` records. A component that fails (e.g. a schema drifted
//! out from under a long-lived query) contributes the empty set to its
//! parent and is recorded in `QueryResult.errors` rather than aborting the
//! whole query.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::adapters::graph::Direction;
use crate::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
use crate::error::Result;
use crate::schema_manager::SchemaManager;

use super::planner::{PlannedClause, PlannedComponent, PlannedStep, PlannedStepKind};
use super::{DistanceOrder, LogicalOperator, QueryError, QueryResult};

pub struct QueryExecutor {
    relational: Arc<RelationalAdapter>,
    graph: Arc<GraphAdapter>,
    vector: Arc<VectorAdapter>,
    schema: Arc<SchemaManager>,
}

impl QueryExecutor {
    pub fn new(
        relational: Arc<RelationalAdapter>,
        graph: Arc<GraphAdapter>,
        vector: Arc<VectorAdapter>,
        schema: Arc<SchemaManager>,
    ) -> Self {
        Self { relational, graph, vector, schema }
    }

    /// Execute a planned clause tree and materialize the resulting ids into
    /// full object instances.
    pub async fn execute(&self, plan: &PlannedClause) -> Result<QueryResult> {
        let mut errors = Vec::new();
        let mut distance_order: Option<DistanceOrder> = None;
        let ids = self.eval_clause(plan, &mut errors, &mut distance_order).await;

        let object_type = plan.primary_object_type();
        let Some(object_type) = object_type else {
            return Ok(QueryResult { objects: Vec::new(), errors });
        };
        let Some(otd) = self.schema.get_object_type(object_type).await else {
            errors.push(QueryError {
                object_type_name: object_type.to_string(),
                message: format!("object type '{object_type}' no longer exists"),
            });
            return Ok(QueryResult { objects: Vec::new(), errors });
        };

        let ordered_ids: Vec<Uuid> = match &distance_order {
            Some(order) => order.sort_by_distance(ids),
            None => {
                let mut v: Vec<Uuid> = ids.into_iter().collect();
                v.sort();
                v
            }
        };

        let objects = self.relational.get_objects_by_ids(&otd, &ordered_ids).await?;
        let mut by_id = objects.into_iter().map(|o| (o.memory.id, o)).collect::<std::collections::HashMap<_, _>>();
        let ordered_objects = ordered_ids.into_iter().filter_map(|id| by_id.remove(&id)).collect();

        Ok(QueryResult { objects: ordered_objects, errors })
    }

    fn eval_clause<'a>(
        &'a self,
        clause: &'a PlannedClause,
        errors: &'a mut Vec<QueryError>,
        distance_order: &'a mut Option<DistanceOrder>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = HashSet<Uuid>> + Send + 'a>> {
        Box::pin(async move {
            match clause {
                PlannedClause::Component(component) => self.eval_component(component, errors, distance_order).await,
                PlannedClause::LogicalGroup { op, clauses } => match op {
                    LogicalOperator::And => {
                        // A group may span more than one object type (spec
                        // §4.8/§4.9): a child whose type differs from the
                        // group's primary type is composed by graph
                        // traversal rather than id intersection, projecting
                        // its ids into the primary type's id space through
                        // the relation that connects the two types.
                        let group_type = clause.primary_object_type().map(str::to_string);
                        let mut acc: Option<HashSet<Uuid>> = None;
                        for child in clauses {
                            let child_ids = self.eval_clause(child, errors, distance_order).await;
                            let child_type = child.primary_object_type();
                            let next = match (&group_type, child_type) {
                                (Some(group_type), Some(child_type)) if group_type.as_str() != child_type => {
                                    let seed = match acc.take() {
                                        Some(ids) => ids,
                                        None => match self.relational.get_all_object_ids_for_type(group_type).await {
                                            Ok(ids) => ids,
                                            Err(e) => {
                                                errors.push(QueryError {
                                                    object_type_name: group_type.clone(),
                                                    message: e.to_string(),
                                                });
                                                HashSet::new()
                                            }
                                        },
                                    };
                                    match self.bridge_relation(group_type, child_type).await {
                                        Some((relation_type, direction)) => {
                                            match self
                                                .graph
                                                .bridge_ids_by_target_set(
                                                    group_type,
                                                    &seed,
                                                    &relation_type,
                                                    direction,
                                                    child_type,
                                                    &child_ids,
                                                )
                                                .await
                                            {
                                                Ok(ids) => ids,
                                                Err(e) => {
                                                    errors.push(QueryError {
                                                        object_type_name: group_type.clone(),
                                                        message: e.to_string(),
                                                    });
                                                    HashSet::new()
                                                }
                                            }
                                        }
                                        None => {
                                            errors.push(QueryError {
                                                object_type_name: group_type.clone(),
                                                message: format!(
                                                    "no relation connects '{group_type}' to '{child_type}' for AND composition"
                                                ),
                                            });
                                            HashSet::new()
                                        }
                                    }
                                }
                                _ => match acc.take() {
                                    None => child_ids,
                                    Some(prev) => prev.intersection(&child_ids).copied().collect(),
                                },
                            };
                            acc = Some(next);
                            if acc.as_ref().is_some_and(|s| s.is_empty()) {
                                break;
                            }
                        }
                        acc.unwrap_or_default()
                    }
                    LogicalOperator::Or => {
                        let mut union = HashSet::new();
                        for child in clauses {
                            let child_ids = self.eval_clause(child, errors, distance_order).await;
                            union.extend(child_ids);
                        }
                        union
                    }
                },
                PlannedClause::Not(inner) => {
                    let Some(object_type) = inner.primary_object_type() else {
                        return HashSet::new();
                    };
                    let universe = match self.relational.get_all_object_ids_for_type(object_type).await {
                        Ok(ids) => ids,
                        Err(e) => {
                            errors.push(QueryError { object_type_name: object_type.to_string(), message: e.to_string() });
                            return HashSet::new();
                        }
                    };
                    let child_ids = self.eval_clause(inner, errors, distance_order).await;
                    universe.difference(&child_ids).copied().collect()
                }
            }
        })
    }

    /// Finds a relation type connecting `from_type` to `to_type` in either
    /// direction, for bridging a mixed-type `AND` group. The first match in
    /// schema order wins; spec §4.8 leaves tie-break among multiple
    /// connecting relations unspecified.
    async fn bridge_relation(&self, from_type: &str, to_type: &str) -> Option<(String, Direction)> {
        for rtd in self.schema.list_relation_types().await {
            let forward = rtd.source_otds.iter().any(|t| t == from_type) && rtd.target_otds.iter().any(|t| t == to_type);
            if forward {
                return Some((rtd.name, Direction::Outgoing));
            }
            let backward = rtd.source_otds.iter().any(|t| t == to_type) && rtd.target_otds.iter().any(|t| t == from_type);
            if backward {
                return Some((rtd.name, Direction::Incoming));
            }
        }
        None
    }

    async fn eval_component(
        &self,
        component: &PlannedComponent,
        errors: &mut Vec<QueryError>,
        distance_order: &mut Option<DistanceOrder>,
    ) -> HashSet<Uuid> {
        if component.steps.is_empty() {
            return match self.relational.get_all_object_ids_for_type(&component.object_type).await {
                Ok(ids) => ids,
                Err(e) => {
                    errors.push(QueryError { object_type_name: component.object_type.clone(), message: e.to_string() });
                    HashSet::new()
                }
            };
        }

        let last_step = component.steps.len() - 1;
        let mut outputs: Vec<HashSet<Uuid>> = Vec::with_capacity(component.steps.len());
        for (i, step) in component.steps.iter().enumerate() {
            let input = step.input_step.map(|i| &outputs[i]);
            let result = self.eval_step(&component.object_type, step, input).await;
            match result {
                Ok((ids, ranked)) => {
                    if let Some(ranked) = ranked {
                        if i == last_step {
                            *distance_order = Some(DistanceOrder::from_ranked(ranked));
                        }
                    }
                    outputs.push(ids);
                }
                Err(e) => {
                    errors.push(QueryError { object_type_name: component.object_type.clone(), message: e.to_string() });
                    outputs.push(HashSet::new());
                }
            }
        }
        outputs.pop().unwrap_or_default()
    }

    async fn eval_step(
        &self,
        object_type: &str,
        step: &PlannedStep,
        input: Option<&HashSet<Uuid>>,
    ) -> Result<(HashSet<Uuid>, Option<Vec<Uuid>>)> {
        match &step.kind {
            PlannedStepKind::SqliteFilter(filters) => {
                let ids = self.relational.find_object_ids_by_properties(object_type, filters, input).await?;
                Ok((ids, None))
            }
            PlannedStepKind::KuzuTraverse(traversals) => {
                let seed = match input {
                    Some(ids) => ids.clone(),
                    None => self.relational.get_all_object_ids_for_type(object_type).await?,
                };
                let ids = self.graph.filter_object_ids_by_relations(object_type, &seed, traversals).await?;
                Ok((ids, None))
            }
            PlannedStepKind::LanceDbSearch(search) => {
                let ed = self.schema.get_embedding_definition(&search.ed_name).await.ok_or_else(|| {
                    crate::error::GrizabellaError::Schema(format!("unknown embedding definition '{}'", search.ed_name))
                })?;
                let model = self.vector.get_embedding_model(&ed.embedding_model).await?;
                let query_vector = model.embed(&search.similar_to_payload).await?;
                let hits = self
                    .vector
                    .find_object_ids_by_similarity(&search.ed_name, &query_vector, search.limit, input)
                    .await?;
                let filtered: Vec<(Uuid, f32)> = match search.threshold {
                    Some(threshold) if search.is_l2_distance => hits.into_iter().filter(|(_, d)| *d <= threshold).collect(),
                    Some(threshold) => hits.into_iter().filter(|(_, d)| *d >= threshold).collect(),
                    None => hits,
                };
                let ranked: Vec<Uuid> = filtered.iter().map(|(id, _)| *id).collect();
                let ids: HashSet<Uuid> = ranked.iter().copied().collect();
                Ok((ids, Some(ranked)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::EmbeddingModelCache;
    use crate::adapters::relational::RelationalFilter;
    use crate::config::PoolConfig;
    use crate::pool::ThreadSafeGraphHandle;
    use crate::query::planner::QueryPlanner;
    use crate::query::{ComplexQuery, QueryComponent};
    use crate::types::{ObjectTypeDefinition, Property, PropertyDataType, PropertyValue};

    async fn test_stack() -> (Arc<RelationalAdapter>, Arc<GraphAdapter>, Arc<VectorAdapter>, Arc<SchemaManager>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let relational = Arc::new(RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default()).await.unwrap());
        let graph_dir = dir.path().join("kuzu_data");
        std::fs::create_dir_all(&graph_dir).unwrap();
        let graph = Arc::new(GraphAdapter::new(ThreadSafeGraphHandle::open(&graph_dir).unwrap()));
        let vector = Arc::new(VectorAdapter::open(&dir.path().join("lancedb_data"), EmbeddingModelCache::new()).await.unwrap());
        let schema = Arc::new(SchemaManager::load(relational.clone(), graph.clone(), vector.clone()).await.unwrap());
        (relational, graph, vector, schema, dir)
    }

    /// Like `test_stack`, but with a `"stub"` embedding model pre-registered
    /// at `dimensions` so `LanceDbSearch` steps resolve without the
    /// write-path's `get_or_stub` fallback (the executor's own embedding
    /// lookup has no such fallback — an unregistered model is a hard error).
    async fn test_stack_with_model(
        dimensions: usize,
    ) -> (Arc<RelationalAdapter>, Arc<GraphAdapter>, Arc<VectorAdapter>, Arc<SchemaManager>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let relational = Arc::new(RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default()).await.unwrap());
        let graph_dir = dir.path().join("kuzu_data");
        std::fs::create_dir_all(&graph_dir).unwrap();
        let graph = Arc::new(GraphAdapter::new(ThreadSafeGraphHandle::open(&graph_dir).unwrap()));
        let model_cache = EmbeddingModelCache::new();
        model_cache
            .register(Arc::new(crate::adapters::embedding::StubEmbeddingModel::new("stub", dimensions)))
            .await;
        let vector = Arc::new(VectorAdapter::open(&dir.path().join("lancedb_data"), model_cache).await.unwrap());
        let schema = Arc::new(SchemaManager::load(relational.clone(), graph.clone(), vector.clone()).await.unwrap());
        (relational, graph, vector, schema, dir)
    }

    #[tokio::test]
    async fn executes_relational_only_component() {
        let (relational, graph, vector, schema, _dir) = test_stack().await;
        schema
            .create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("year", PropertyDataType::Integer)]))
            .await
            .unwrap();
        let otd = schema.get_object_type("Paper").await.unwrap();

        let im = crate::instance_manager::InstanceManager::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
        let mut props_a = std::collections::HashMap::new();
        props_a.insert("year".to_string(), PropertyValue::Integer(2023));
        im.upsert_object("Paper", None, props_a, None).await.unwrap();
        let mut props_b = std::collections::HashMap::new();
        props_b.insert("year".to_string(), PropertyValue::Integer(2020));
        im.upsert_object("Paper", None, props_b, None).await.unwrap();
        let _ = &otd;

        let planner = QueryPlanner::new(schema.clone());
        let executor = QueryExecutor::new(relational, graph, vector, schema);

        let mut component = QueryComponent::new("Paper");
        component.relational_filters.push(RelationalFilter::eq("year", PropertyValue::Integer(2023)));
        let query = ComplexQuery::from_components(vec![component]);
        let plan = planner.plan(&query).await.unwrap();
        let result = executor.execute(&plan).await.unwrap();

        assert!(result.errors.is_empty());
        assert_eq!(result.objects.len(), 1);
    }

    #[tokio::test]
    async fn not_clause_computes_complement_of_universe() {
        let (relational, graph, vector, schema, _dir) = test_stack().await;
        schema
            .create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("year", PropertyDataType::Integer)]))
            .await
            .unwrap();
        let im = crate::instance_manager::InstanceManager::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
        let mut props_a = std::collections::HashMap::new();
        props_a.insert("year".to_string(), PropertyValue::Integer(2023));
        im.upsert_object("Paper", None, props_a, None).await.unwrap();
        let mut props_b = std::collections::HashMap::new();
        props_b.insert("year".to_string(), PropertyValue::Integer(2020));
        im.upsert_object("Paper", None, props_b, None).await.unwrap();

        let planner = QueryPlanner::new(schema.clone());
        let executor = QueryExecutor::new(relational, graph, vector, schema);

        let mut component = QueryComponent::new("Paper");
        component.relational_filters.push(RelationalFilter::eq("year", PropertyValue::Integer(2023)));
        use crate::query::Clause;
        let query = ComplexQuery::from_root(Clause::Not(Box::new(Clause::Component(component))));
        let plan = planner.plan(&query).await.unwrap();
        let result = executor.execute(&plan).await.unwrap();

        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].properties.get("year"), Some(&PropertyValue::Integer(2020)));
    }
}
