//! Query Planner and Executor (spec §4.8, §4.9).
//!
//! A `ComplexQuery` is a Boolean tree of clauses (`AND`/`OR`/`NOT`) whose
//! leaves are per-object-type components combining relational filters,
//! embedding searches, and graph traversals. The planner compiles this into
//! a mirror tree of per-substrate execution steps; the executor walks it
//! bottom-up, composing identifier sets by set algebra.

mod executor;
mod planner;

pub use executor::QueryExecutor;
pub use planner::{PlannedClause, PlannedComponent, PlannedStep, QueryPlanner};

use std::collections::HashSet;
use uuid::Uuid;

use crate::adapters::graph::GraphTraversalClause;
use crate::adapters::relational::RelationalFilter;
use crate::types::ObjectInstance;

/// `AND`/`OR` combinator for a [`LogicalGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// A declarative similarity-search leaf within a [`QueryComponent`].
#[derive(Debug, Clone)]
pub struct EmbeddingSearchClause {
    pub ed_name: String,
    pub similar_to_payload: String,
    pub limit: usize,
    pub threshold: Option<f32>,
    pub is_l2_distance: bool,
    /// When set, similarity hits are hydrated into full `ObjectInstance`
    /// records rather than returned as raw `{id, vector, preview, distance}`
    /// hits (spec §9 open question — implemented, not rejected).
    pub retrieve_full_objects: bool,
}

/// A leaf clause: a primary object type plus any combination of relational
/// filters, embedding searches, and graph traversals, all scoped to that
/// type.
#[derive(Debug, Clone)]
pub struct QueryComponent {
    pub object_type_name: String,
    pub relational_filters: Vec<RelationalFilter>,
    pub embedding_searches: Vec<EmbeddingSearchClause>,
    pub graph_traversals: Vec<GraphTraversalClause>,
}

impl QueryComponent {
    pub fn new(object_type_name: impl Into<String>) -> Self {
        Self {
            object_type_name: object_type_name.into(),
            relational_filters: Vec::new(),
            embedding_searches: Vec::new(),
            graph_traversals: Vec::new(),
        }
    }
}

/// The recursive clause tree: a leaf component, a logical `AND`/`OR` group,
/// or a negation.
#[derive(Debug, Clone)]
pub enum Clause {
    Component(QueryComponent),
    LogicalGroup { op: LogicalOperator, clauses: Vec<Clause> },
    Not(Box<Clause>),
}

impl Clause {
    /// The object type a clause ultimately resolves ids against: for a
    /// component, its own type; for a group or negation, the first child's.
    /// A `LogicalGroup` may legitimately mix types (e.g. an `AND` of a
    /// `Researcher` component and a `Paper` component, composed via graph
    /// traversal rather than id intersection), so this is only a "best
    /// guess" label for the root's materialization type in that case. The
    /// one place type ambiguity would silently misbehave - a `NOT` whose
    /// universe must be drawn from a single type - is rejected up front by
    /// the planner (`QueryPlanner::plan_clause`), which requires a `NOT`'s
    /// inner clause to resolve to one unambiguous type before accepting it.
    pub fn primary_object_type(&self) -> Option<&str> {
        match self {
            Clause::Component(c) => Some(&c.object_type_name),
            Clause::LogicalGroup { clauses, .. } => clauses.first().and_then(Clause::primary_object_type),
            Clause::Not(c) => c.primary_object_type(),
        }
    }
}

/// A query's root: either the legacy flat `components` list (implicit AND)
/// or an explicit `query_root` clause tree.
#[derive(Debug, Clone)]
pub struct ComplexQuery {
    pub query_root: Clause,
}

impl ComplexQuery {
    /// Wrap a flat list of components as an implicit `AND`, per spec §4.8
    /// transformation 1.
    pub fn from_components(components: Vec<QueryComponent>) -> Self {
        Self {
            query_root: Clause::LogicalGroup {
                op: LogicalOperator::And,
                clauses: components.into_iter().map(Clause::Component).collect(),
            },
        }
    }

    pub fn from_root(query_root: Clause) -> Self {
        Self { query_root }
    }
}

/// A single per-component error collected during execution; a component
/// that errors contributes the empty set to its parent rather than aborting
/// the whole query.
#[derive(Debug, Clone)]
pub struct QueryError {
    pub object_type_name: String,
    pub message: String,
}

/// The result of executing a [`ComplexQuery`]: materialized object
/// instances plus any per-component errors encountered along the way.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub objects: Vec<ObjectInstance>,
    pub errors: Vec<QueryError>,
}

/// Ordered distance metadata preserved when a single embedding step drives
/// the whole query (spec §4.9 "Ordering").
#[derive(Debug, Clone, Default)]
pub struct DistanceOrder {
    pub order: Vec<Uuid>,
}

impl DistanceOrder {
    pub fn from_ranked(ids: Vec<Uuid>) -> Self {
        Self { order: ids }
    }

    pub fn sort_by_distance(&self, ids: HashSet<Uuid>) -> Vec<Uuid> {
        let mut ordered: Vec<Uuid> = self.order.iter().copied().filter(|id| ids.contains(id)).collect();
        let mut remaining: Vec<Uuid> = ids.into_iter().filter(|id| !self.order.contains(id)).collect();
        remaining.sort();
        ordered.extend(remaining);
        ordered
    }
}
