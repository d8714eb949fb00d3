//! Vector Adapter (spec §4.3).
//!
//! One LanceDB table per embedding definition, keyed by object-instance id
//! (one row per id). Owns the embedding-model cache shared across every ED
//! that names the same model identifier.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::error::{GrizabellaError, Result};
use crate::pool::{ConnectionFactory, ConnectionPool, PooledConnection};
use crate::types::{EmbeddingDefinition, EmbeddingInstance};

use super::embedding::{EmbeddingModel, EmbeddingModelCache};
use super::sanitize_identifier;

/// Table name for an embedding definition's vector table.
pub fn embedding_table_name(ed_name: &str) -> String {
    sanitize_identifier("e_", ed_name)
}

/// A single similarity-search hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub object_instance_id: Uuid,
    pub vector: Vec<f32>,
    pub preview: String,
    pub distance: f32,
}

fn table_schema(dimensions: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("object_instance_id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimensions),
            false,
        ),
        Field::new("preview", DataType::Utf8, false),
    ]))
}

fn instance_to_batch(schema: Arc<Schema>, dimensions: i32, instance: &EmbeddingInstance) -> Result<RecordBatch> {
    if instance.vector.len() as i32 != dimensions {
        return Err(GrizabellaError::Embedding(format!(
            "vector length {} does not match embedding definition dimensionality {dimensions}",
            instance.vector.len()
        )));
    }
    let ids = StringArray::from(vec![instance.object_instance_id.to_string()]);
    let previews = StringArray::from(vec![instance.preview.clone()]);
    let values = Float32Array::from(instance.vector.clone());
    let vectors = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dimensions,
        Arc::new(values),
        None,
    )
    .map_err(|e| GrizabellaError::Embedding(format!("failed to build vector column: {e}")))?;

    RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(vectors), Arc::new(previews)])
        .map_err(|e| GrizabellaError::Database(format!("failed to build embedding record batch: {e}")))
}

/// A factory over LanceDB connections for one vector directory. Unlike
/// `rusqlite::Connection`, `lancedb::Connection` is an async, cheap-to-clone
/// handle over the underlying object store, not a single blocking resource;
/// pooling it still bounds concurrency and gives the Resource Monitor
/// occupancy to sample, matching the relational adapter's pattern (spec
/// §4.5).
struct VectorConnectionFactory {
    uri: String,
}

#[async_trait::async_trait]
impl ConnectionFactory for VectorConnectionFactory {
    type Connection = lancedb::Connection;

    async fn create(&self) -> Result<Self::Connection> {
        lancedb::connect(&self.uri)
            .execute()
            .await
            .map_err(|e| GrizabellaError::Database(format!("failed to open lancedb at {}: {e}", self.uri)))
    }

    async fn is_alive(&self, conn: &Self::Connection) -> bool {
        conn.table_names().execute().await.is_ok()
    }
}

/// Persists embedding rows per ED and owns the model cache.
pub struct VectorAdapter {
    pool: Arc<ConnectionPool<VectorConnectionFactory>>,
    model_cache: EmbeddingModelCache,
}

impl VectorAdapter {
    pub async fn open(vector_dir: &Path, model_cache: EmbeddingModelCache) -> Result<Self> {
        Self::open_with_pool_config(vector_dir, model_cache, &PoolConfig::default()).await
    }

    pub async fn open_with_pool_config(vector_dir: &Path, model_cache: EmbeddingModelCache, pool_config: &PoolConfig) -> Result<Self> {
        std::fs::create_dir_all(vector_dir).map_err(|e| {
            GrizabellaError::Database(format!("failed to create vector directory {}: {e}", vector_dir.display()))
        })?;
        let uri = vector_dir.to_string_lossy().to_string();
        let factory = VectorConnectionFactory { uri };
        let pool = ConnectionPool::new(
            factory,
            pool_config.max_connections_per_type,
            pool_config.max_idle_time,
            pool_config.acquire_timeout,
        );
        Ok(Self { pool, model_cache })
    }

    pub fn model_cache(&self) -> &EmbeddingModelCache {
        &self.model_cache
    }

    pub async fn get_embedding_model(&self, identifier: &str) -> Result<Arc<dyn EmbeddingModel>> {
        self.model_cache.get(identifier).await
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

    async fn with_conn<R, Fut>(&self, f: impl FnOnce(lancedb::Connection) -> Fut) -> Result<R>
    where
        Fut: std::future::Future<Output = Result<R>>,
    {
        let PooledConnection { connection, bypass } = self.pool.acquire().await?;
        let result = f(connection.clone()).await;
        self.pool.release(PooledConnection { connection, bypass }).await;
        result
    }

    /// Idempotently create the vector table for `ed`. `SchemaError` if
    /// `ed.dimensions == 0`.
    pub async fn create_table(&self, ed: &EmbeddingDefinition) -> Result<()> {
        if ed.dimensions == 0 {
            return Err(GrizabellaError::Schema(format!(
                "embedding definition '{}' must declare dimensions > 0",
                ed.name
            )));
        }
        let table_name = embedding_table_name(&ed.name);
        self.with_conn(|conn| async move {
            let existing = conn
                .table_names()
                .execute()
                .await
                .map_err(|e| GrizabellaError::Database(e.to_string()))?;
            if existing.contains(&table_name) {
                return Ok(());
            }
            let schema = table_schema(ed.dimensions as i32);
            let empty_batches = RecordBatchIterator::new(std::iter::empty::<std::result::Result<RecordBatch, arrow_schema::ArrowError>>(), schema.clone());
            conn.create_table(&table_name, Box::new(empty_batches))
                .execute()
                .await
                .map_err(|e| GrizabellaError::Schema(format!("failed to create vector table '{table_name}': {e}")))?;
            Ok(())
        })
        .await
    }

    async fn open_table(&self, ed_name: &str) -> Result<lancedb::Table> {
        let table_name = embedding_table_name(ed_name);
        self.with_conn(|conn| async move {
            conn.open_table(&table_name)
                .execute()
                .await
                .map_err(|_| GrizabellaError::Database(format!("vector table for '{ed_name}' does not exist")))
        })
        .await
    }

    /// Insert or replace the row for `instance.object_instance_id`.
    pub async fn upsert_instance(&self, ed: &EmbeddingDefinition, instance: &EmbeddingInstance) -> Result<()> {
        let table = self.open_table(&ed.name).await?;
        table
            .delete(&format!("object_instance_id = '{}'", instance.object_instance_id))
            .await
            .map_err(|e| GrizabellaError::Database(format!("failed to clear existing embedding row: {e}")))?;

        let schema = table_schema(ed.dimensions as i32);
        let batch = instance_to_batch(schema.clone(), ed.dimensions as i32, instance)?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| GrizabellaError::Database(format!("failed to upsert embedding row: {e}")))?;
        Ok(())
    }

    pub async fn get_instances_for_object(&self, obj_id: Uuid, ed_name: &str) -> Result<Vec<EmbeddingInstance>> {
        let table = match self.open_table(ed_name).await {
            Ok(table) => table,
            Err(_) => return Ok(Vec::new()),
        };
        let mut stream = table
            .query()
            .only_if(format!("object_instance_id = '{obj_id}'"))
            .execute()
            .await
            .map_err(|e| GrizabellaError::Database(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| GrizabellaError::Database(e.to_string()))? {
            out.extend(batch_to_instances(&batch, ed_name, None)?);
        }
        Ok(out)
    }

    pub async fn get_instance(&self, ed_name: &str, obj_id: Uuid) -> Result<Option<EmbeddingInstance>> {
        Ok(self.get_instances_for_object(obj_id, ed_name).await?.into_iter().next())
    }

    /// Idempotent: deleting a non-existent row is not an error.
    pub async fn delete_instances_for_object(&self, obj_id: Uuid, ed_name: &str) -> Result<()> {
        let table = match self.open_table(ed_name).await {
            Ok(table) => table,
            Err(_) => return Ok(()),
        };
        table
            .delete(&format!("object_instance_id = '{obj_id}'"))
            .await
            .map_err(|e| GrizabellaError::Database(format!("failed to delete embedding row: {e}")))?;
        Ok(())
    }

    /// Top-k nearest neighbors, optionally pre-filtered by a substrate-native
    /// predicate string (typically `object_instance_id IN (...)`).
    pub async fn query_similar(
        &self,
        ed_name: &str,
        query_vector: &[f32],
        limit: usize,
        filter_condition: Option<&str>,
    ) -> Result<Vec<VectorHit>> {
        let table = self.open_table(ed_name).await?;
        let mut query = table
            .query()
            .nearest_to(query_vector)
            .map_err(|e| GrizabellaError::Database(format!("failed to build vector query: {e}")))?
            .limit(limit);
        if let Some(filter) = filter_condition {
            query = query.only_if(filter.to_string());
        }
        let mut stream = query
            .execute()
            .await
            .map_err(|e| GrizabellaError::Database(format!("vector search failed: {e}")))?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| GrizabellaError::Database(e.to_string()))? {
            hits.extend(batch_to_hits(&batch)?);
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Convenience wrapper returning `(id, distance)` pairs. When
    /// `initial_ids` is `Some` and empty, returns empty without touching the
    /// substrate; when non-empty, pushes the set down as a filter.
    pub async fn find_object_ids_by_similarity(
        &self,
        ed_name: &str,
        query_vector: &[f32],
        limit: usize,
        initial_ids: Option<&HashSet<Uuid>>,
    ) -> Result<Vec<(Uuid, f32)>> {
        if let Some(ids) = initial_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
        }
        let filter = initial_ids.map(|ids| {
            let list = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
            format!("object_instance_id IN ({list})")
        });
        let hits = self.query_similar(ed_name, query_vector, limit, filter.as_deref()).await?;
        Ok(hits.into_iter().map(|h| (h.object_instance_id, h.distance)).collect())
    }
}

fn batch_to_instances(batch: &RecordBatch, ed_name: &str, _unused: Option<()>) -> Result<Vec<EmbeddingInstance>> {
    let ids = downcast_string(batch, "object_instance_id")?;
    let previews = downcast_string(batch, "preview")?;
    let vectors = downcast_fixed_size_list(batch, "vector")?;

    let mut out = Vec::new();
    for row in 0..batch.num_rows() {
        let id = Uuid::parse_str(ids.value(row))
            .map_err(|e| GrizabellaError::Instance(format!("invalid embedding row id: {e}")))?;
        let vector = fixed_size_list_row(vectors, row)?;
        out.push(EmbeddingInstance {
            object_instance_id: id,
            embedding_definition_name: ed_name.to_string(),
            vector,
            preview: previews.value(row).to_string(),
        });
    }
    Ok(out)
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
    let ids = downcast_string(batch, "object_instance_id")?;
    let previews = downcast_string(batch, "preview")?;
    let vectors = downcast_fixed_size_list(batch, "vector")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| GrizabellaError::Database("vector search result missing _distance column".to_string()))?;

    let mut out = Vec::new();
    for row in 0..batch.num_rows() {
        let id = Uuid::parse_str(ids.value(row))
            .map_err(|e| GrizabellaError::Instance(format!("invalid embedding row id: {e}")))?;
        out.push(VectorHit {
            object_instance_id: id,
            vector: fixed_size_list_row(vectors, row)?,
            preview: previews.value(row).to_string(),
            distance: distances.value(row),
        });
    }
    Ok(out)
}

fn downcast_string<'a>(batch: &'a RecordBatch, column: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(column)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| GrizabellaError::Database(format!("column '{column}' missing or wrong type")))
}

fn downcast_fixed_size_list<'a>(batch: &'a RecordBatch, column: &str) -> Result<&'a FixedSizeListArray> {
    batch
        .column_by_name(column)
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| GrizabellaError::Database(format!("column '{column}' missing or wrong type")))
}

fn fixed_size_list_row(array: &FixedSizeListArray, row: usize) -> Result<Vec<f32>> {
    let value = array.value(row);
    let floats = value
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| GrizabellaError::Database("vector column is not float32".to_string()))?;
    Ok(floats.values().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_table_rejects_zero_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = VectorAdapter::open(dir.path(), EmbeddingModelCache::new()).await.unwrap();
        let ed = EmbeddingDefinition::new("bad_ed", "Paper", "summary", "stub", 0);
        assert!(adapter.create_table(&ed).await.is_err());
    }

    #[tokio::test]
    async fn upsert_and_fetch_embedding_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = VectorAdapter::open(dir.path(), EmbeddingModelCache::new()).await.unwrap();
        let ed = EmbeddingDefinition::new("summary_embedding", "Paper", "summary", "stub", 4);
        adapter.create_table(&ed).await.unwrap();

        let id = Uuid::new_v4();
        let instance = EmbeddingInstance::new(id, "summary_embedding", vec![0.1, 0.2, 0.3, 0.4], "hello world");
        adapter.upsert_instance(&ed, &instance).await.unwrap();

        let fetched = adapter.get_instance("summary_embedding", id).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().preview, "hello world");

        adapter.delete_instances_for_object(id, "summary_embedding").await.unwrap();
        assert!(adapter.get_instance("summary_embedding", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_instance_on_missing_table_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = VectorAdapter::open(dir.path(), EmbeddingModelCache::new()).await.unwrap();
        assert!(adapter.get_instance("nonexistent", Uuid::new_v4()).await.unwrap().is_none());
    }
}
