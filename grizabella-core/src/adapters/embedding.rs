//! Embedding models and the model cache the Vector Adapter keeps keyed by
//! model identifier (spec §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{GrizabellaError, Result};

/// A named source of text embeddings. Real deployments plug in a provider
/// (local ONNX model, hosted API, etc); [`StubEmbeddingModel`] is the
/// dependency-free default used when no provider is configured.
#[async_trait]
pub trait EmbeddingModel: Send + Sync + 'static {
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A deterministic, dependency-free embedding model used as the default so
/// Grizabella works out of the box without a model download. Not intended to
/// produce semantically meaningful vectors.
#[derive(Debug, Clone)]
pub struct StubEmbeddingModel {
    model_id: String,
    dimensions: usize,
}

impl StubEmbeddingModel {
    pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingModel for StubEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Hash-based pseudo-embedding: stable across calls, cheap, and
        // bounded to [-1.0, 1.0] so downstream cosine-similarity math behaves.
        let mut vector = vec![0.0_f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimensions.max(1);
            vector[slot] += (byte as f32 / 255.0) - 0.5;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

/// Cache of loaded embedding models keyed by model identifier, shared across
/// every embedding definition that names the same model.
#[derive(Clone, Default)]
pub struct EmbeddingModelCache {
    models: Arc<RwLock<HashMap<String, Arc<dyn EmbeddingModel>>>>,
}

impl EmbeddingModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its own `model_id`, replacing any prior entry.
    pub async fn register(&self, model: Arc<dyn EmbeddingModel>) {
        self.models.write().await.insert(model.model_id().to_string(), model);
    }

    pub async fn get(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>> {
        self.models
            .read()
            .await
            .get(model_id)
            .cloned()
            .ok_or_else(|| GrizabellaError::Embedding(format!("no embedding model registered for '{model_id}'")))
    }

    /// Convenience for model ids the cache has never seen: register a
    /// [`StubEmbeddingModel`] on first use rather than failing.
    pub async fn get_or_stub(&self, model_id: &str, dimensions: usize) -> Arc<dyn EmbeddingModel> {
        if let Ok(model) = self.get(model_id).await {
            return model;
        }
        let model: Arc<dyn EmbeddingModel> = Arc::new(StubEmbeddingModel::new(model_id, dimensions));
        self.register(model.clone()).await;
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_model_is_deterministic() {
        let model = StubEmbeddingModel::new("stub", 8);
        let a = model.embed("hello world").await.unwrap();
        let b = model.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn cache_get_or_stub_registers_on_first_use() {
        let cache = EmbeddingModelCache::new();
        let model = cache.get_or_stub("stub-embedding", 16).await;
        assert_eq!(model.model_id(), "stub-embedding");
        assert_eq!(model.dimensions(), 16);
        assert!(cache.get("stub-embedding").await.is_ok());
    }
}
