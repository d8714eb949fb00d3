//! JSON request/response shapes for the remote tool-call surface (spec §6).
//!
//! `ObjectTypeDefinition`, `RelationTypeDefinition`, `EmbeddingDefinition`,
//! `ObjectInstance`, `RelationInstance`, and `PropertyValue` already derive
//! `serde`, so schema/instance payloads pass straight through. The query
//! clause tree and its adapter-level filter types do not derive `serde`
//! (they are internal engine types), so this module carries small DTO
//! mirrors with `TryFrom` conversions into the real types.

use std::collections::HashMap;

use grizabella_core::adapters::graph::{Direction, GraphPropertyFilter, GraphTraversalClause};
use grizabella_core::adapters::relational::{CompareOp, RelationalFilter};
use grizabella_core::error::GrizabellaError;
use grizabella_core::query::{Clause, ComplexQuery, EmbeddingSearchClause, LogicalOperator, QueryComponent};
use grizabella_core::types::PropertyValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---- Schema -----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpsertObjectRequest {
    pub object_type_name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AddRelationRequest {
    pub relation_type_name: String,
    pub source_object_id: Uuid,
    pub target_object_id: Uuid,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRelationRequest {
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FindObjectsRequest {
    #[serde(default)]
    pub filters: Vec<RelationalFilterDto>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelationalFilterDto {
    Eq { property: String, value: PropertyValue },
    Ne { property: String, value: PropertyValue },
    Lt { property: String, value: PropertyValue },
    Le { property: String, value: PropertyValue },
    Gt { property: String, value: PropertyValue },
    Ge { property: String, value: PropertyValue },
    In { property: String, values: Vec<PropertyValue> },
}

impl From<RelationalFilterDto> for RelationalFilter {
    fn from(dto: RelationalFilterDto) -> Self {
        match dto {
            RelationalFilterDto::Eq { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Eq, value }
            }
            RelationalFilterDto::Ne { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Ne, value }
            }
            RelationalFilterDto::Lt { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Lt, value }
            }
            RelationalFilterDto::Le { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Le, value }
            }
            RelationalFilterDto::Gt { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Gt, value }
            }
            RelationalFilterDto::Ge { property, value } => {
                RelationalFilter::Compare { property, operator: CompareOp::Ge, value }
            }
            RelationalFilterDto::In { property, values } => RelationalFilter::In { property, values },
        }
    }
}

// ---- Query --------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ComplexQueryDto {
    #[serde(default)]
    pub components: Vec<QueryComponentDto>,
    #[serde(default)]
    pub query_root: Option<ClauseDto>,
}

impl TryFrom<ComplexQueryDto> for ComplexQuery {
    type Error = GrizabellaError;

    fn try_from(dto: ComplexQueryDto) -> Result<Self, Self::Error> {
        if let Some(root) = dto.query_root {
            return Ok(ComplexQuery::from_root(root.try_into()?));
        }
        let components: Result<Vec<QueryComponent>, GrizabellaError> =
            dto.components.into_iter().map(TryInto::try_into).collect();
        Ok(ComplexQuery::from_components(components?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClauseDto {
    Component(QueryComponentDto),
    LogicalGroup { op: LogicalOperatorDto, clauses: Vec<ClauseDto> },
    Not { clause: Box<ClauseDto> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperatorDto {
    And,
    Or,
}

impl TryFrom<ClauseDto> for Clause {
    type Error = GrizabellaError;

    fn try_from(dto: ClauseDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            ClauseDto::Component(c) => Clause::Component(c.try_into()?),
            ClauseDto::LogicalGroup { op, clauses } => Clause::LogicalGroup {
                op: match op {
                    LogicalOperatorDto::And => LogicalOperator::And,
                    LogicalOperatorDto::Or => LogicalOperator::Or,
                },
                clauses: clauses.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
            },
            ClauseDto::Not { clause } => Clause::Not(Box::new((*clause).try_into()?)),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryComponentDto {
    pub object_type_name: String,
    #[serde(default)]
    pub relational_filters: Vec<RelationalFilterDto>,
    #[serde(default)]
    pub embedding_searches: Vec<EmbeddingSearchClauseDto>,
    #[serde(default)]
    pub graph_traversals: Vec<GraphTraversalClauseDto>,
}

impl TryFrom<QueryComponentDto> for QueryComponent {
    type Error = GrizabellaError;

    fn try_from(dto: QueryComponentDto) -> Result<Self, Self::Error> {
        Ok(QueryComponent {
            object_type_name: dto.object_type_name,
            relational_filters: dto.relational_filters.into_iter().map(Into::into).collect(),
            embedding_searches: dto.embedding_searches.into_iter().map(Into::into).collect(),
            graph_traversals: dto.graph_traversals.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingSearchClauseDto {
    pub ed_name: String,
    pub similar_to_payload: String,
    pub limit: usize,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default = "default_true")]
    pub is_l2_distance: bool,
    #[serde(default)]
    pub retrieve_full_objects: bool,
}

fn default_true() -> bool {
    true
}

impl From<EmbeddingSearchClauseDto> for EmbeddingSearchClause {
    fn from(dto: EmbeddingSearchClauseDto) -> Self {
        EmbeddingSearchClause {
            ed_name: dto.ed_name,
            similar_to_payload: dto.similar_to_payload,
            limit: dto.limit,
            threshold: dto.threshold,
            is_l2_distance: dto.is_l2_distance,
            retrieve_full_objects: dto.retrieve_full_objects,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    Outgoing,
    Incoming,
}

#[derive(Debug, Deserialize)]
pub struct GraphTraversalClauseDto {
    pub relation_type: String,
    pub direction: DirectionDto,
    pub target_type: String,
    #[serde(default)]
    pub target_object_id: Option<Uuid>,
    #[serde(default)]
    pub target_object_properties: Vec<RelationalFilterDto>,
}

impl TryFrom<GraphTraversalClauseDto> for GraphTraversalClause {
    type Error = GrizabellaError;

    fn try_from(dto: GraphTraversalClauseDto) -> Result<Self, Self::Error> {
        let mut properties = Vec::with_capacity(dto.target_object_properties.len());
        for filter in dto.target_object_properties {
            let compare: RelationalFilter = filter.into();
            let RelationalFilter::Compare { property, operator, value } = compare else {
                return Err(GrizabellaError::Validation(
                    "graph traversal target property filters must be single comparisons, not IN sets".into(),
                ));
            };
            properties.push(GraphPropertyFilter { property, operator, value });
        }
        Ok(GraphTraversalClause {
            relation_type: dto.relation_type,
            direction: match dto.direction {
                DirectionDto::Outgoing => Direction::Outgoing,
                DirectionDto::Incoming => Direction::Incoming,
            },
            target_type: dto.target_type,
            target_object_id: dto.target_object_id,
            target_object_properties: properties,
        })
    }
}

// ---- Query responses ------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct QueryResultDto {
    pub objects: Vec<grizabella_core::types::ObjectInstance>,
    pub errors: Vec<QueryErrorDto>,
}

#[derive(Debug, Serialize)]
pub struct QueryErrorDto {
    pub object_type_name: String,
    pub message: String,
}

impl From<grizabella_core::query::QueryResult> for QueryResultDto {
    fn from(result: grizabella_core::query::QueryResult) -> Self {
        Self {
            objects: result.objects,
            errors: result
                .errors
                .into_iter()
                .map(|e| QueryErrorDto { object_type_name: e.object_type_name, message: e.message })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VectorHitDto {
    pub object_instance_id: Uuid,
    pub vector: Vec<f32>,
    pub preview: String,
    pub distance: f32,
}

impl From<grizabella_core::adapters::vector::VectorHit> for VectorHitDto {
    fn from(hit: grizabella_core::adapters::vector::VectorHit) -> Self {
        Self {
            object_instance_id: hit.object_instance_id,
            vector: hit.vector,
            preview: hit.preview,
            distance: hit.distance,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FindSimilarRequest {
    pub ed_name: String,
    pub query_text: String,
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchSimilarObjectsRequest {
    pub object_id: Uuid,
    pub ed_name: String,
    pub n_results: usize,
}
