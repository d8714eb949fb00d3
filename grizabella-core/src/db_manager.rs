//! Database Manager (spec §6 Library API surface).
//!
//! `GrizabellaDb` is the single facade callers construct: it resolves a
//! logical name or path to the three substrate locations, opens each
//! adapter, and wires them through a `SchemaManager`/`InstanceManager`/
//! `QueryPlanner`/`QueryExecutor`. Mirrors the teacher's
//! `locai::init`/`init_with_defaults` entry points in spirit — one
//! constructor, one close, everything else an inherent method.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::adapters::embedding::EmbeddingModelCache;
use crate::adapters::relational::RelationalFilter;
use crate::adapters::vector::VectorHit;
use crate::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
use crate::config::GrizabellaConfig;
use crate::error::{GrizabellaError, Result};
use crate::instance_manager::InstanceManager;
use crate::path_resolver::{self, PathSet};
use crate::pool::ThreadSafeGraphHandle;
use crate::query::{ComplexQuery, EmbeddingSearchClause, QueryExecutor, QueryPlanner, QueryResult};
use crate::resource_monitor::ResourceMonitor;
use crate::schema_manager::SchemaManager;
use crate::types::{
    EmbeddingDefinition, ObjectInstance, ObjectTypeDefinition, PropertyValue, RelationInstance,
    RelationTypeDefinition,
};

/// The open handle to a single Grizabella database instance, wrapping the
/// three substrate adapters and the engine components built on top of them.
pub struct GrizabellaDb {
    paths: PathSet,
    relational: Arc<RelationalAdapter>,
    graph: Arc<GraphAdapter>,
    vector: Arc<VectorAdapter>,
    schema: Arc<SchemaManager>,
    instances: InstanceManager,
    planner: QueryPlanner,
    executor: QueryExecutor,
    monitor: Option<ResourceMonitor>,
}

impl GrizabellaDb {
    /// Resolve `db_name_or_path`, open every substrate, rebuild the schema
    /// cache, and start the resource monitor if configured.
    pub async fn connect(db_name_or_path: &str, create_if_not_exists: bool) -> Result<Self> {
        Self::connect_with_config(db_name_or_path, create_if_not_exists, &GrizabellaConfig::default()).await
    }

    pub async fn connect_with_config(
        db_name_or_path: &str,
        create_if_not_exists: bool,
        config: &GrizabellaConfig,
    ) -> Result<Self> {
        let paths = path_resolver::resolve(db_name_or_path, create_if_not_exists)?;
        std::fs::create_dir_all(&paths.vector_dir)
            .map_err(|e| GrizabellaError::Configuration(format!("failed to create vector dir: {e}")))?;
        std::fs::create_dir_all(&paths.graph_dir)
            .map_err(|e| GrizabellaError::Configuration(format!("failed to create graph dir: {e}")))?;

        let lockfile = path_resolver::graph_lockfile(&paths.graph_dir);
        if lockfile.exists() {
            tracing::warn!(path = %lockfile.display(), "removing stale graph lockfile on open");
            let _ = std::fs::remove_file(&lockfile);
        }

        let relational = Arc::new(RelationalAdapter::open(&paths.relational_file, &config.storage.pool).await?);
        let graph_handle = ThreadSafeGraphHandle::open(&paths.graph_dir)?;
        let graph = Arc::new(GraphAdapter::new(graph_handle));
        let model_cache = EmbeddingModelCache::new();
        model_cache
            .register(Arc::new(crate::adapters::embedding::StubEmbeddingModel::new(
                config.embedding.default_model.clone(),
                config.embedding.default_dimensions,
            )))
            .await;
        let vector = Arc::new(VectorAdapter::open_with_pool_config(&paths.vector_dir, model_cache, &config.storage.pool).await?);

        let schema = Arc::new(SchemaManager::load(relational.clone(), graph.clone(), vector.clone()).await?);
        let instances = InstanceManager::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
        let planner = QueryPlanner::new(schema.clone());
        let executor = QueryExecutor::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
        let monitor = ResourceMonitor::start(relational.clone(), vector.clone(), config.resource_monitor.clone());

        Ok(Self {
            paths,
            relational,
            graph,
            vector,
            schema,
            instances,
            planner,
            executor,
            monitor,
        })
    }

    /// Close every substrate connection. Idempotent: callers may call this
    /// more than once (e.g. via `Drop` and an explicit call) without error.
    pub async fn close(self) {
        if let Some(monitor) = self.monitor {
            monitor.shutdown().await;
        }
        self.relational.shutdown().await;
        self.vector.shutdown().await;
    }

    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    // ---- Schema -------------------------------------------------------

    pub async fn create_object_type(&self, otd: ObjectTypeDefinition) -> Result<()> {
        self.schema.create_object_type(otd).await
    }

    pub async fn get_object_type(&self, name: &str) -> Option<ObjectTypeDefinition> {
        self.schema.get_object_type(name).await
    }

    pub async fn list_object_types(&self) -> Vec<ObjectTypeDefinition> {
        self.schema.list_object_types().await
    }

    pub async fn delete_object_type(&self, name: &str) -> Result<()> {
        self.schema.delete_object_type(name).await
    }

    pub async fn create_relation_type(&self, rtd: RelationTypeDefinition) -> Result<()> {
        self.schema.create_relation_type(rtd).await
    }

    pub async fn get_relation_type(&self, name: &str) -> Option<RelationTypeDefinition> {
        self.schema.get_relation_type(name).await
    }

    pub async fn list_relation_types(&self) -> Vec<RelationTypeDefinition> {
        self.schema.list_relation_types().await
    }

    pub async fn delete_relation_type(&self, name: &str) -> Result<()> {
        self.schema.delete_relation_type(name).await
    }

    pub async fn create_embedding_definition(&self, ed: EmbeddingDefinition) -> Result<()> {
        self.schema.create_embedding_definition(ed).await
    }

    pub async fn get_embedding_definition(&self, name: &str) -> Option<EmbeddingDefinition> {
        self.schema.get_embedding_definition(name).await
    }

    // ---- Instances ------------------------------------------------------

    pub async fn upsert_object(
        &self,
        object_type_name: &str,
        id: Option<Uuid>,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<ObjectInstance> {
        self.instances.upsert_object(object_type_name, id, properties, weight).await
    }

    pub async fn get_object_by_id(&self, object_type_name: &str, id: Uuid) -> Result<Option<ObjectInstance>> {
        let otd = self
            .schema
            .get_object_type(object_type_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown object type '{object_type_name}'")))?;
        let mut found = self.relational.get_objects_by_ids(&otd, &[id]).await?;
        Ok(found.pop())
    }

    pub async fn delete_object(&self, object_type_name: &str, id: Uuid) -> Result<()> {
        self.instances.delete_object(object_type_name, id).await
    }

    pub async fn find_objects(
        &self,
        object_type_name: &str,
        filter_criteria: &[RelationalFilter],
        limit: Option<usize>,
    ) -> Result<Vec<ObjectInstance>> {
        let otd = self
            .schema
            .get_object_type(object_type_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown object type '{object_type_name}'")))?;
        self.relational.query_instances(&otd, filter_criteria, limit, None).await
    }

    pub async fn add_relation(
        &self,
        relation_type_name: &str,
        source_object_id: Uuid,
        target_object_id: Uuid,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<RelationInstance> {
        self.instances
            .upsert_relation(relation_type_name, None, source_object_id, target_object_id, properties, weight)
            .await
    }

    pub async fn update_relation(
        &self,
        relation_type_name: &str,
        id: Uuid,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<RelationInstance> {
        self.instances.update_relation(relation_type_name, id, properties, weight).await
    }

    pub async fn get_relation(&self, relation_type_name: &str, id: Uuid) -> Result<Option<RelationInstance>> {
        self.graph.get_relation_instance(relation_type_name, id).await
    }

    pub async fn delete_relation(&self, relation_type_name: &str, id: Uuid) -> Result<bool> {
        self.instances.delete_relation(relation_type_name, id).await
    }

    pub async fn get_outgoing_relations(
        &self,
        relation_type_name: &str,
        source_object_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<RelationInstance>> {
        self.graph
            .find_relation_instances(Some(relation_type_name), Some(source_object_id), None, limit)
            .await
    }

    pub async fn get_incoming_relations(
        &self,
        relation_type_name: &str,
        target_object_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<RelationInstance>> {
        self.graph
            .find_relation_instances(Some(relation_type_name), None, Some(target_object_id), limit)
            .await
    }

    // ---- Query ----------------------------------------------------------

    pub async fn execute_complex_query(&self, query: ComplexQuery) -> Result<QueryResult> {
        let plan = self.planner.plan(&query).await?;
        self.executor.execute(&plan).await
    }

    /// Similarity search by free text against a single embedding definition,
    /// independent of the complex-query machinery.
    pub async fn find_similar(&self, ed_name: &str, query_text: &str, limit: usize) -> Result<Vec<VectorHit>> {
        let ed = self
            .schema
            .get_embedding_definition(ed_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown embedding definition '{ed_name}'")))?;
        let model = self.vector.get_embedding_model(&ed.embedding_model).await?;
        let query_vector = model.embed(query_text).await?;
        self.vector.query_similar(ed_name, &query_vector, limit, None).await
    }

    /// Similarity search seeded from an existing object's own embedding
    /// rather than free text.
    pub async fn search_similar_objects(
        &self,
        obj_id: Uuid,
        ed_name: &str,
        n_results: usize,
        _search_properties: Option<&[String]>,
    ) -> Result<Vec<VectorHit>> {
        self.instances.find_objects_similar_to_instance(obj_id, ed_name, n_results).await
    }

    /// Build an `EmbeddingSearchClause` for use inside a `ComplexQuery`
    /// component, applying the embedding definition's own defaults.
    pub fn embedding_search(&self, ed_name: impl Into<String>, similar_to_payload: impl Into<String>, limit: usize) -> EmbeddingSearchClause {
        EmbeddingSearchClause {
            ed_name: ed_name.into(),
            similar_to_payload: similar_to_payload.into(),
            limit,
            threshold: None,
            is_l2_distance: true,
            retrieve_full_objects: false,
        }
    }
}

/// RAII-ish scoped session: `enter` connects, `exit` closes; both idempotent
/// in the sense that a session that is never entered has nothing to close.
pub struct GrizabellaSession {
    db: Option<GrizabellaDb>,
}

impl GrizabellaSession {
    pub fn new() -> Self {
        Self { db: None }
    }

    pub async fn enter(&mut self, db_name_or_path: &str, create_if_not_exists: bool) -> Result<&GrizabellaDb> {
        if self.db.is_none() {
            self.db = Some(GrizabellaDb::connect(db_name_or_path, create_if_not_exists).await?);
        }
        Ok(self.db.as_ref().expect("just set"))
    }

    pub async fn exit(&mut self) {
        if let Some(db) = self.db.take() {
            db.close().await;
        }
    }
}

impl Default for GrizabellaSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Property, PropertyDataType};

    #[tokio::test]
    async fn connect_create_query_and_close_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("knowledge_base");
        let db = GrizabellaDb::connect(db_path.to_str().unwrap(), true).await.unwrap();

        db.create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("year", PropertyDataType::Integer)]))
            .await
            .unwrap();

        let mut props = HashMap::new();
        props.insert("year".to_string(), PropertyValue::Integer(2023));
        let instance = db.upsert_object("Paper", None, props, None).await.unwrap();

        let fetched = db.get_object_by_id("Paper", instance.id()).await.unwrap();
        assert!(fetched.is_some());

        db.close().await;
    }

    #[tokio::test]
    async fn scoped_session_enter_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("knowledge_base");
        let mut session = GrizabellaSession::new();
        session.enter(db_path.to_str().unwrap(), true).await.unwrap();
        session.enter(db_path.to_str().unwrap(), true).await.unwrap();
        session.exit().await;
    }
}
