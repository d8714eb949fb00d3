//! Query Planner (spec §4.8).
//!
//! Validates every type/property/ED/RTD a [`ComplexQuery`] references, then
//! walks the clause tree producing a mirror tree of planned nodes. Within a
//! leaf component, steps are ordered relational-filters-first (cheap seed
//! set), then graph traversals (filtered by the seed), then embedding
//! searches with pushed-down id filters last.

use std::sync::Arc;

use crate::adapters::graph::GraphTraversalClause;
use crate::adapters::relational::RelationalFilter;
use crate::error::{GrizabellaError, Result};
use crate::schema_manager::SchemaManager;

use super::{Clause, ComplexQuery, EmbeddingSearchClause, LogicalOperator, QueryComponent};

/// A single planned execution step within a component, carrying a
/// back-reference to the step whose output id set feeds it as a filter
/// (`None` means "unconstrained": the substrate's full set for this type).
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub kind: PlannedStepKind,
    pub input_step: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum PlannedStepKind {
    SqliteFilter(Vec<RelationalFilter>),
    KuzuTraverse(Vec<GraphTraversalClause>),
    LanceDbSearch(EmbeddingSearchClause),
}

/// A planned leaf: the primary object type, its ordered steps, and the
/// original component for error attribution.
#[derive(Debug, Clone)]
pub struct PlannedComponent {
    pub object_type: String,
    pub steps: Vec<PlannedStep>,
    pub original: QueryComponent,
}

/// The planned mirror of [`Clause`].
#[derive(Debug, Clone)]
pub enum PlannedClause {
    Component(PlannedComponent),
    LogicalGroup { op: LogicalOperator, clauses: Vec<PlannedClause> },
    Not(Box<PlannedClause>),
}

impl PlannedClause {
    /// The object type a planned clause ultimately resolves ids against.
    /// Mirrors [`Clause::primary_object_type`] over the planned tree.
    pub fn primary_object_type(&self) -> Option<&str> {
        match self {
            PlannedClause::Component(c) => Some(c.object_type.as_str()),
            PlannedClause::LogicalGroup { clauses, .. } => clauses.first().and_then(PlannedClause::primary_object_type),
            PlannedClause::Not(c) => c.primary_object_type(),
        }
    }
}

/// The single object type every leaf under `clause` agrees on, or `None` if
/// two leaves disagree. A `LogicalGroup` may legitimately span more than one
/// type (composition via graph traversal rather than id intersection), but a
/// `NOT` needs exactly one type to compute its universe, so only `NOT`
/// planning consults this.
fn single_clause_type(clause: &Clause) -> Option<&str> {
    match clause {
        Clause::Component(c) => Some(c.object_type_name.as_str()),
        Clause::Not(inner) => single_clause_type(inner),
        Clause::LogicalGroup { clauses, .. } => {
            let mut agreed: Option<&str> = None;
            for child in clauses {
                let child_type = single_clause_type(child)?;
                match agreed {
                    None => agreed = Some(child_type),
                    Some(t) if t == child_type => {}
                    Some(_) => return None,
                }
            }
            agreed
        }
    }
}

pub struct QueryPlanner {
    schema: Arc<SchemaManager>,
}

impl QueryPlanner {
    pub fn new(schema: Arc<SchemaManager>) -> Self {
        Self { schema }
    }

    pub async fn plan(&self, query: &ComplexQuery) -> Result<PlannedClause> {
        self.plan_clause(&query.query_root).await
    }

    fn plan_clause<'a>(
        &'a self,
        clause: &'a Clause,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<PlannedClause>> + Send + 'a>> {
        Box::pin(async move {
            match clause {
                Clause::Component(component) => Ok(PlannedClause::Component(self.plan_component(component).await?)),
                Clause::LogicalGroup { op, clauses } => {
                    let mut planned = Vec::with_capacity(clauses.len());
                    for child in clauses {
                        planned.push(self.plan_clause(child).await?);
                    }
                    Ok(PlannedClause::LogicalGroup { op: *op, clauses: planned })
                }
                Clause::Not(inner) => {
                    if single_clause_type(inner).is_none() {
                        return Err(GrizabellaError::Schema(
                            "NOT requires its clause to resolve to a single, unambiguous object type".to_string(),
                        ));
                    }
                    Ok(PlannedClause::Not(Box::new(self.plan_clause(inner).await?)))
                }
            }
        })
    }

    async fn plan_component(&self, component: &QueryComponent) -> Result<PlannedComponent> {
        let otd = self
            .schema
            .get_object_type(&component.object_type_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown object type '{}'", component.object_type_name)))?;

        for filter in &component.relational_filters {
            let property_name = match filter {
                RelationalFilter::Compare { property, .. } => property,
                RelationalFilter::In { property, .. } => property,
            };
            if otd.property(property_name).is_none() {
                return Err(GrizabellaError::Schema(format!(
                    "unknown property '{property_name}' on object type '{}'",
                    otd.name
                )));
            }
        }

        for search in &component.embedding_searches {
            let ed = self
                .schema
                .get_embedding_definition(&search.ed_name)
                .await
                .ok_or_else(|| GrizabellaError::Schema(format!("unknown embedding definition '{}'", search.ed_name)))?;
            if ed.object_type_name != otd.name {
                return Err(GrizabellaError::Schema(format!(
                    "embedding definition '{}' targets '{}', not '{}'",
                    ed.name, ed.object_type_name, otd.name
                )));
            }
        }

        for traversal in &component.graph_traversals {
            let rtd = self
                .schema
                .get_relation_type(&traversal.relation_type)
                .await
                .ok_or_else(|| GrizabellaError::Schema(format!("unknown relation type '{}'", traversal.relation_type)))?;
            if self.schema.get_object_type(&traversal.target_type).await.is_none() {
                return Err(GrizabellaError::Schema(format!("unknown object type '{}'", traversal.target_type)));
            }
            let _ = rtd;
        }

        let mut steps = Vec::new();
        if !component.relational_filters.is_empty() {
            steps.push(PlannedStep {
                kind: PlannedStepKind::SqliteFilter(component.relational_filters.clone()),
                input_step: None,
            });
        }
        if !component.graph_traversals.is_empty() {
            let input_step = if steps.is_empty() { None } else { Some(steps.len() - 1) };
            steps.push(PlannedStep {
                kind: PlannedStepKind::KuzuTraverse(component.graph_traversals.clone()),
                input_step,
            });
        }
        for search in &component.embedding_searches {
            let input_step = if steps.is_empty() { None } else { Some(steps.len() - 1) };
            steps.push(PlannedStep {
                kind: PlannedStepKind::LanceDbSearch(search.clone()),
                input_step,
            });
        }

        Ok(PlannedComponent {
            object_type: otd.name,
            steps,
            original: component.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::EmbeddingModelCache;
    use crate::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
    use crate::config::PoolConfig;
    use crate::pool::ThreadSafeGraphHandle;
    use crate::types::{ObjectTypeDefinition, Property, PropertyDataType};

    async fn test_schema() -> (Arc<SchemaManager>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let relational = Arc::new(RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default()).await.unwrap());
        let graph_dir = dir.path().join("kuzu_data");
        std::fs::create_dir_all(&graph_dir).unwrap();
        let graph = Arc::new(GraphAdapter::new(ThreadSafeGraphHandle::open(&graph_dir).unwrap()));
        let vector = Arc::new(VectorAdapter::open(&dir.path().join("lancedb_data"), EmbeddingModelCache::new()).await.unwrap());
        let schema = Arc::new(SchemaManager::load(relational, graph, vector).await.unwrap());
        schema
            .create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("year", PropertyDataType::Integer)]))
            .await
            .unwrap();
        (schema, dir)
    }

    #[tokio::test]
    async fn plan_orders_relational_before_graph_before_embedding() {
        let (schema, _dir) = test_schema().await;
        let planner = QueryPlanner::new(schema);
        let mut component = QueryComponent::new("Paper");
        component.relational_filters.push(RelationalFilter::eq("year", crate::types::PropertyValue::Integer(2023)));
        let query = ComplexQuery::from_components(vec![component]);
        let plan = planner.plan(&query).await.unwrap();
        match plan {
            PlannedClause::LogicalGroup { clauses, .. } => match &clauses[0] {
                PlannedClause::Component(c) => {
                    assert_eq!(c.steps.len(), 1);
                    assert!(matches!(c.steps[0].kind, PlannedStepKind::SqliteFilter(_)));
                }
                _ => panic!("expected component"),
            },
            _ => panic!("expected logical group"),
        }
    }

    #[tokio::test]
    async fn plan_rejects_unknown_object_type() {
        let (schema, _dir) = test_schema().await;
        let planner = QueryPlanner::new(schema);
        let query = ComplexQuery::from_components(vec![QueryComponent::new("Ghost")]);
        assert!(planner.plan(&query).await.is_err());
    }

    #[tokio::test]
    async fn plan_rejects_not_over_mixed_type_group() {
        let (schema, _dir) = test_schema().await;
        schema
            .create_object_type(ObjectTypeDefinition::new(
                "Author",
                vec![Property::new("name", PropertyDataType::Text)],
            ))
            .await
            .unwrap();
        let planner = QueryPlanner::new(schema);
        let mixed = Clause::LogicalGroup {
            op: LogicalOperator::And,
            clauses: vec![Clause::Component(QueryComponent::new("Paper")), Clause::Component(QueryComponent::new("Author"))],
        };
        let query = ComplexQuery::from_root(Clause::Not(Box::new(mixed)));
        assert!(planner.plan(&query).await.is_err());
    }

    #[tokio::test]
    async fn plan_accepts_not_over_single_type_group() {
        let (schema, _dir) = test_schema().await;
        let planner = QueryPlanner::new(schema);
        let same_type = Clause::LogicalGroup {
            op: LogicalOperator::Or,
            clauses: vec![Clause::Component(QueryComponent::new("Paper")), Clause::Component(QueryComponent::new("Paper"))],
        };
        let query = ComplexQuery::from_root(Clause::Not(Box::new(same_type)));
        assert!(planner.plan(&query).await.is_ok());
    }
}
