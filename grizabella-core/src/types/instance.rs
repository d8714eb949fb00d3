//! Concrete instances: objects, relations, and the embeddings derived from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::property::PropertyValue;

/// Fields every entity carries, mixed into [`ObjectInstance`] and
/// [`RelationInstance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInstance {
    pub id: Uuid,
    /// Bounded numeric confidence, stored as decimal. Defaults to 1.0.
    pub weight: f64,
    pub upsert_date: DateTime<Utc>,
}

impl MemoryInstance {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            weight: 1.0,
            upsert_date: Utc::now(),
        }
    }
}

impl Default for MemoryInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// A concrete entity: id, object-type name, and a property map whose keys are
/// a subset of the OTD's declared properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInstance {
    #[serde(flatten)]
    pub memory: MemoryInstance,
    pub object_type_name: String,
    pub properties: HashMap<String, PropertyValue>,
}

impl ObjectInstance {
    pub fn new(object_type_name: impl Into<String>) -> Self {
        Self {
            memory: MemoryInstance::new(),
            object_type_name: object_type_name.into(),
            properties: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.memory.id
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// A concrete edge: id, relation-type name, endpoint ids, and a property map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationInstance {
    #[serde(flatten)]
    pub memory: MemoryInstance,
    pub relation_type_name: String,
    pub source_object_id: Uuid,
    pub target_object_id: Uuid,
    pub properties: HashMap<String, PropertyValue>,
}

impl RelationInstance {
    pub fn new(
        relation_type_name: impl Into<String>,
        source_object_id: Uuid,
        target_object_id: Uuid,
    ) -> Self {
        Self {
            memory: MemoryInstance::new(),
            relation_type_name: relation_type_name.into(),
            source_object_id,
            target_object_id,
            properties: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.memory.id
    }
}

/// Maximum length, in characters, of an embedding's source-text preview.
pub const EMBEDDING_PREVIEW_MAX_CHARS: usize = 200;

/// The vector derived from a single object's source property under a single
/// embedding definition. Owned by the ED's table; deleted whenever the source
/// object is deleted or its source property changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingInstance {
    pub object_instance_id: Uuid,
    pub embedding_definition_name: String,
    pub vector: Vec<f32>,
    pub preview: String,
}

impl EmbeddingInstance {
    pub fn new(
        object_instance_id: Uuid,
        embedding_definition_name: impl Into<String>,
        vector: Vec<f32>,
        source_text: &str,
    ) -> Self {
        let preview: String = source_text.chars().take(EMBEDDING_PREVIEW_MAX_CHARS).collect();
        Self {
            object_instance_id,
            embedding_definition_name: embedding_definition_name.into(),
            vector,
            preview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_truncated_to_200_chars() {
        let long_text: String = "a".repeat(250);
        let inst = EmbeddingInstance::new(Uuid::new_v4(), "ed", vec![0.0; 4], &long_text);
        assert_eq!(inst.preview.chars().count(), EMBEDDING_PREVIEW_MAX_CHARS);
    }

    #[test]
    fn short_text_preview_is_unchanged() {
        let inst = EmbeddingInstance::new(Uuid::new_v4(), "ed", vec![0.0; 4], "short");
        assert_eq!(inst.preview, "short");
    }

    #[test]
    fn object_instance_carries_fresh_id_and_weight() {
        let obj = ObjectInstance::new("Book");
        assert_eq!(obj.memory.weight, 1.0);
        assert_ne!(obj.id(), Uuid::nil());
    }
}
