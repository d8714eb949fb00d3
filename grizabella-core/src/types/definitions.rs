//! Schema definitions: Object Type, Relation Type, and Embedding definitions.

use serde::{Deserialize, Serialize};

use super::property::{Property, PropertyDataType};
use crate::error::{GrizabellaError, Result};

/// The schema for an entity class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectTypeDefinition {
    pub name: String,
    pub properties: Vec<Property>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ObjectTypeDefinition {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
            description: None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Names must be unique within the owner; `id`, if declared, must be
    /// UUID-typed.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for prop in &self.properties {
            if !seen.insert(prop.name.as_str()) {
                return Err(GrizabellaError::Schema(format!(
                    "duplicate property '{}' on object type '{}'",
                    prop.name, self.name
                )));
            }
            if prop.is_id() && prop.data_type != PropertyDataType::Uuid {
                return Err(GrizabellaError::Schema(format!(
                    "property 'id' on object type '{}' must be UUID-typed",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// The schema for a typed directed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationTypeDefinition {
    pub name: String,
    pub source_otds: Vec<String>,
    pub target_otds: Vec<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RelationTypeDefinition {
    pub fn new(
        name: impl Into<String>,
        source_otds: Vec<String>,
        target_otds: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_otds,
            target_otds,
            properties: Vec::new(),
            description: None,
        }
    }

    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }
}

/// Declarative vectorization rule: a chosen text property on an OTD is
/// automatically embedded using a named model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingDefinition {
    pub name: String,
    pub object_type_name: String,
    pub source_property_name: String,
    pub embedding_model: String,
    pub dimensions: usize,
    #[serde(default)]
    pub description: Option<String>,
}

impl EmbeddingDefinition {
    pub fn new(
        name: impl Into<String>,
        object_type_name: impl Into<String>,
        source_property_name: impl Into<String>,
        embedding_model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            name: name.into(),
            object_type_name: object_type_name.into(),
            source_property_name: source_property_name.into(),
            embedding_model: embedding_model.into(),
            dimensions,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(GrizabellaError::Schema(format!(
                "embedding definition '{}' must declare dimensions > 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// The three kinds of persisted definition, used when addressing the
/// Relational Adapter's metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    ObjectType,
    RelationType,
    EmbeddingDefinition,
}

impl DefinitionKind {
    pub fn metadata_table(&self) -> &'static str {
        match self {
            DefinitionKind::ObjectType => "object_types",
            DefinitionKind::RelationType => "relation_types",
            DefinitionKind::EmbeddingDefinition => "embedding_definitions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_property_names_are_rejected() {
        let otd = ObjectTypeDefinition::new(
            "Book",
            vec![
                Property::new("title", PropertyDataType::Text),
                Property::new("title", PropertyDataType::Text),
            ],
        );
        assert!(otd.validate().is_err());
    }

    #[test]
    fn non_uuid_id_property_is_rejected() {
        let otd = ObjectTypeDefinition::new(
            "Book",
            vec![Property::new("id", PropertyDataType::Text)],
        );
        assert!(otd.validate().is_err());
    }

    #[test]
    fn embedding_definition_requires_positive_dimensions() {
        let ed = EmbeddingDefinition::new("summary_embedding", "Paper", "summary", "stub", 0);
        assert!(ed.validate().is_err());
    }
}
