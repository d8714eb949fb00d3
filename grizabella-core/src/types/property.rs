//! Property definitions and the typed value sum that backs them.

use serde::{Deserialize, Serialize};

/// The semantic type of a [`Property`], mirrored one-to-one onto a physical
/// column/field in each of the three substrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyDataType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Blob,
    Json,
    Uuid,
}

impl PropertyDataType {
    /// Name used in error messages and relational type-mapping decisions.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyDataType::Text => "TEXT",
            PropertyDataType::Integer => "INTEGER",
            PropertyDataType::Float => "FLOAT",
            PropertyDataType::Boolean => "BOOLEAN",
            PropertyDataType::DateTime => "DATETIME",
            PropertyDataType::Blob => "BLOB",
            PropertyDataType::Json => "JSON",
            PropertyDataType::Uuid => "UUID",
        }
    }
}

/// A named, typed attribute on an object or relation type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub data_type: PropertyDataType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, data_type: PropertyDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            unique: false,
            indexed: false,
            description: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `id`, if declared, must be UUID-typed and becomes the primary key.
    pub fn is_id(&self) -> bool {
        self.name == "id"
    }
}

/// A closed sum of the eight [`PropertyDataType`] variants, with `Json`
/// serving as the escape hatch for arbitrary nested structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(chrono::DateTime<chrono::Utc>),
    Blob(Vec<u8>),
    Json(serde_json::Value),
    Uuid(uuid::Uuid),
}

impl PropertyValue {
    pub fn data_type(&self) -> PropertyDataType {
        match self {
            PropertyValue::Text(_) => PropertyDataType::Text,
            PropertyValue::Integer(_) => PropertyDataType::Integer,
            PropertyValue::Float(_) => PropertyDataType::Float,
            PropertyValue::Boolean(_) => PropertyDataType::Boolean,
            PropertyValue::DateTime(_) => PropertyDataType::DateTime,
            PropertyValue::Blob(_) => PropertyDataType::Blob,
            PropertyValue::Json(_) => PropertyDataType::Json,
            PropertyValue::Uuid(_) => PropertyDataType::Uuid,
        }
    }

    /// The text this value would contribute to an embedding source property,
    /// or `None` when the value is not textual (non-TEXT properties are never
    /// embedding sources, per the ED invariant).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_builder_sets_flags() {
        let prop = Property::new("title", PropertyDataType::Text)
            .unique()
            .indexed()
            .with_description("book title");
        assert!(prop.unique);
        assert!(prop.indexed);
        assert!(!prop.nullable);
        assert_eq!(prop.description.as_deref(), Some("book title"));
    }

    #[test]
    fn id_property_is_recognized_by_name() {
        let prop = Property::new("id", PropertyDataType::Uuid);
        assert!(prop.is_id());
    }

    #[test]
    fn property_value_round_trips_through_json() {
        let value = PropertyValue::Json(serde_json::json!({"a": 1}));
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: PropertyValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }
}
