//! The remote tool-call surface (spec §6): one HTTP route per library API
//! method, each a thin boundary around a `GrizabellaDb` call. Arguments and
//! results are JSON-serializable structured values; errors are translated by
//! [`crate::error::ApiError`] into the structured envelope.

pub mod dto;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use grizabella_core::types::{EmbeddingDefinition, ObjectTypeDefinition, RelationTypeDefinition};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use self::dto::{
    AddRelationRequest, ComplexQueryDto, FindObjectsRequest, FindSimilarRequest, QueryResultDto,
    SearchSimilarObjectsRequest, UpdateRelationRequest, UpsertObjectRequest, VectorHitDto,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/object-types", post(create_object_type).get(list_object_types))
        .route("/object-types/{name}", get(get_object_type).delete(delete_object_type))
        .route("/relation-types", post(create_relation_type))
        .route("/relation-types/{name}", get(get_relation_type).delete(delete_relation_type))
        .route("/embedding-definitions", post(create_embedding_definition))
        .route("/embedding-definitions/{name}", get(get_embedding_definition))
        .route("/objects", post(upsert_object))
        .route("/objects/{type}/{id}", get(get_object_by_id).delete(delete_object))
        .route("/objects/{type}/query", post(find_objects))
        .route("/relations", post(add_relation))
        .route("/relations/{type}/{id}", get(get_relation).put(update_relation).delete(delete_relation))
        .route("/relations/{type}/outgoing/{source_id}", get(outgoing_relations))
        .route("/relations/{type}/incoming/{target_id}", get(incoming_relations))
        .route("/query/complex", post(execute_complex_query))
        .route("/query/similar", post(find_similar))
        .route("/query/similar-objects", post(search_similar_objects))
        .with_state(state)
}

// ---- Schema -------------------------------------------------------------

async fn create_object_type(State(state): State<AppState>, Json(otd): Json<ObjectTypeDefinition>) -> ApiResult<Json<()>> {
    state.db.create_object_type(otd).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn get_object_type(State(state): State<AppState>, Path(name): Path<String>) -> Json<Option<ObjectTypeDefinition>> {
    Json(state.db.get_object_type(&name).await)
}

async fn list_object_types(State(state): State<AppState>) -> Json<Vec<ObjectTypeDefinition>> {
    Json(state.db.list_object_types().await)
}

async fn delete_object_type(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<()>> {
    state.db.delete_object_type(&name).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn create_relation_type(State(state): State<AppState>, Json(rtd): Json<RelationTypeDefinition>) -> ApiResult<Json<()>> {
    state.db.create_relation_type(rtd).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn get_relation_type(State(state): State<AppState>, Path(name): Path<String>) -> Json<Option<RelationTypeDefinition>> {
    Json(state.db.get_relation_type(&name).await)
}

async fn delete_relation_type(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<()>> {
    state.db.delete_relation_type(&name).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn create_embedding_definition(State(state): State<AppState>, Json(ed): Json<EmbeddingDefinition>) -> ApiResult<Json<()>> {
    state.db.create_embedding_definition(ed).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn get_embedding_definition(State(state): State<AppState>, Path(name): Path<String>) -> Json<Option<EmbeddingDefinition>> {
    Json(state.db.get_embedding_definition(&name).await)
}

// ---- Instances ------------------------------------------------------------

async fn upsert_object(
    State(state): State<AppState>,
    Json(req): Json<UpsertObjectRequest>,
) -> ApiResult<Json<grizabella_core::types::ObjectInstance>> {
    let instance = state
        .db
        .upsert_object(&req.object_type_name, req.id, req.properties, req.weight)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(instance))
}

async fn get_object_by_id(
    State(state): State<AppState>,
    Path((object_type, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Option<grizabella_core::types::ObjectInstance>>> {
    let found = state.db.get_object_by_id(&object_type, id).await.map_err(ApiError::from)?;
    Ok(Json(found))
}

async fn delete_object(State(state): State<AppState>, Path((object_type, id)): Path<(String, Uuid)>) -> ApiResult<Json<()>> {
    state.db.delete_object(&object_type, id).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

async fn find_objects(
    State(state): State<AppState>,
    Path(object_type): Path<String>,
    Json(req): Json<FindObjectsRequest>,
) -> ApiResult<Json<Vec<grizabella_core::types::ObjectInstance>>> {
    let filters: Vec<_> = req.filters.into_iter().map(Into::into).collect();
    let found = state.db.find_objects(&object_type, &filters, req.limit).await.map_err(ApiError::from)?;
    Ok(Json(found))
}

async fn add_relation(
    State(state): State<AppState>,
    Json(req): Json<AddRelationRequest>,
) -> ApiResult<Json<grizabella_core::types::RelationInstance>> {
    let relation = state
        .db
        .add_relation(&req.relation_type_name, req.source_object_id, req.target_object_id, req.properties, req.weight)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(relation))
}

async fn update_relation(
    State(state): State<AppState>,
    Path((relation_type, id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateRelationRequest>,
) -> ApiResult<Json<grizabella_core::types::RelationInstance>> {
    let relation = state
        .db
        .update_relation(&relation_type, id, req.properties, req.weight)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(relation))
}

async fn get_relation(
    State(state): State<AppState>,
    Path((relation_type, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Option<grizabella_core::types::RelationInstance>>> {
    let found = state.db.get_relation(&relation_type, id).await.map_err(ApiError::from)?;
    Ok(Json(found))
}

async fn delete_relation(State(state): State<AppState>, Path((relation_type, id)): Path<(String, Uuid)>) -> ApiResult<Json<bool>> {
    let deleted = state.db.delete_relation(&relation_type, id).await.map_err(ApiError::from)?;
    Ok(Json(deleted))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

async fn outgoing_relations(
    State(state): State<AppState>,
    Path((relation_type, source_id)): Path<(String, Uuid)>,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Vec<grizabella_core::types::RelationInstance>>> {
    let relations = state.db.get_outgoing_relations(&relation_type, source_id, q.limit).await.map_err(ApiError::from)?;
    Ok(Json(relations))
}

async fn incoming_relations(
    State(state): State<AppState>,
    Path((relation_type, target_id)): Path<(String, Uuid)>,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Vec<grizabella_core::types::RelationInstance>>> {
    let relations = state.db.get_incoming_relations(&relation_type, target_id, q.limit).await.map_err(ApiError::from)?;
    Ok(Json(relations))
}

// ---- Query ----------------------------------------------------------------

async fn execute_complex_query(State(state): State<AppState>, Json(dto): Json<ComplexQueryDto>) -> ApiResult<Json<QueryResultDto>> {
    let query: grizabella_core::query::ComplexQuery = dto.try_into().map_err(ApiError::from)?;
    let result = state.db.execute_complex_query(query).await.map_err(ApiError::from)?;
    Ok(Json(result.into()))
}

async fn find_similar(State(state): State<AppState>, Json(req): Json<FindSimilarRequest>) -> ApiResult<Json<Vec<VectorHitDto>>> {
    let hits = state.db.find_similar(&req.ed_name, &req.query_text, req.limit).await.map_err(ApiError::from)?;
    Ok(Json(hits.into_iter().map(Into::into).collect()))
}

async fn search_similar_objects(
    State(state): State<AppState>,
    Json(req): Json<SearchSimilarObjectsRequest>,
) -> ApiResult<Json<Vec<VectorHitDto>>> {
    let hits = state
        .db
        .search_similar_objects(req.object_id, &req.ed_name, req.n_results, None)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(hits.into_iter().map(Into::into).collect()))
}
