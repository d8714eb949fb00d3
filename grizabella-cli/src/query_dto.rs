//! Parses the `--query-json` payload accepted by `grizabella-cli query
//! complex` into a [`ComplexQuery`]. Mirrors `grizabella-server`'s request
//! DTO shape so the same JSON body works against either surface.

use grizabella_core::adapters::graph::{Direction, GraphPropertyFilter, GraphTraversalClause};
use grizabella_core::adapters::relational::{CompareOp, RelationalFilter};
use grizabella_core::error::GrizabellaError;
use grizabella_core::query::{Clause, ComplexQuery, EmbeddingSearchClause, LogicalOperator, QueryComponent};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ComplexQueryDto {
    #[serde(default)]
    pub components: Vec<QueryComponentDto>,
    #[serde(default)]
    pub query_root: Option<ClauseDto>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelationalFilterDto {
    Eq { property: String, value: grizabella_core::types::PropertyValue },
    Ne { property: String, value: grizabella_core::types::PropertyValue },
    Lt { property: String, value: grizabella_core::types::PropertyValue },
    Le { property: String, value: grizabella_core::types::PropertyValue },
    Gt { property: String, value: grizabella_core::types::PropertyValue },
    Ge { property: String, value: grizabella_core::types::PropertyValue },
    In { property: String, values: Vec<grizabella_core::types::PropertyValue> },
}

impl From<RelationalFilterDto> for RelationalFilter {
    fn from(dto: RelationalFilterDto) -> Self {
        match dto {
            RelationalFilterDto::Eq { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Eq, value },
            RelationalFilterDto::Ne { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Ne, value },
            RelationalFilterDto::Lt { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Lt, value },
            RelationalFilterDto::Le { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Le, value },
            RelationalFilterDto::Gt { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Gt, value },
            RelationalFilterDto::Ge { property, value } => RelationalFilter::Compare { property, operator: CompareOp::Ge, value },
            RelationalFilterDto::In { property, values } => RelationalFilter::In { property, values },
        }
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

pub fn parse_complex_query(json: &str) -> Result<ComplexQuery, GrizabellaError> {
    let dto: ComplexQueryDto =
        serde_json::from_str(json).map_err(|e| GrizabellaError::Validation(format!("invalid query JSON: {e}")))?;
    dto.try_into()
}
