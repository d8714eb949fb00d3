//! Small parsing helpers shared across handlers.

use std::collections::HashMap;

use grizabella_core::error::{GrizabellaError, Result};
use grizabella_core::types::{Property, PropertyDataType, PropertyValue};

/// Parses `name:type` (e.g. `title:text`, `year:integer`) into a [`Property`]
/// with default flags. Used by `object-type create --property`.
pub fn parse_property_spec(spec: &str) -> Result<Property> {
    let (name, type_name) = spec.split_once(':').ok_or_else(|| {
        GrizabellaError::Validation(format!("property spec '{spec}' must be 'name:type', e.g. 'title:text'"))
    })?;
    let data_type = parse_data_type(type_name)?;
    Ok(Property::new(name, data_type))
}

pub fn parse_data_type(name: &str) -> Result<PropertyDataType> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "text" => PropertyDataType::Text,
        "integer" | "int" => PropertyDataType::Integer,
        "float" => PropertyDataType::Float,
        "boolean" | "bool" => PropertyDataType::Boolean,
        "datetime" => PropertyDataType::DateTime,
        "blob" => PropertyDataType::Blob,
        "json" => PropertyDataType::Json,
        "uuid" => PropertyDataType::Uuid,
        other => return Err(GrizabellaError::Validation(format!("unknown property type '{other}'"))),
    })
}

/// Parses `name=value` CLI pairs into a property map, inferring the
/// `PropertyValue` variant: booleans, integers, and floats parse as such;
/// everything else is stored as text. Use `name:json=<payload>` to force
/// JSON parsing of the value.
pub fn parse_properties(pairs: &[String]) -> Result<HashMap<String, PropertyValue>> {
    let mut properties = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        let (key, raw_value) = pair
            .split_once('=')
            .ok_or_else(|| GrizabellaError::Validation(format!("property '{pair}' must be 'name=value'")))?;
        let (name, value) = if let Some((name, "json")) = key.split_once(':') {
            let parsed: serde_json::Value = serde_json::from_str(raw_value)
                .map_err(|e| GrizabellaError::Validation(format!("invalid JSON for property '{name}': {e}")))?;
            (name.to_string(), PropertyValue::Json(parsed))
        } else {
            (key.to_string(), infer_property_value(raw_value))
        };
        properties.insert(name, value);
    }
    Ok(properties)
}

fn infer_property_value(raw: &str) -> PropertyValue {
    if let Ok(b) = raw.parse::<bool>() {
        return PropertyValue::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return PropertyValue::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return PropertyValue::Float(f);
    }
    if let Ok(u) = uuid::Uuid::parse_str(raw) {
        return PropertyValue::Uuid(u);
    }
    PropertyValue::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_boolean_integer_float_and_text() {
        assert_eq!(infer_property_value("true"), PropertyValue::Boolean(true));
        assert_eq!(infer_property_value("42"), PropertyValue::Integer(42));
        assert_eq!(infer_property_value("3.14"), PropertyValue::Float(3.14));
        assert_eq!(infer_property_value("hello"), PropertyValue::Text("hello".into()));
    }

    #[test]
    fn parse_properties_handles_multiple_pairs() {
        let props = parse_properties(&["title=1984".into(), "year=1949".into()]).unwrap();
        assert_eq!(props.get("title"), Some(&PropertyValue::Text("1984".into())));
        assert_eq!(props.get("year"), Some(&PropertyValue::Integer(1949)));
    }

    #[test]
    fn json_property_forces_json_variant() {
        let props = parse_properties(&["meta:json={\"a\":1}".into()]).unwrap();
        assert_eq!(props.get("meta"), Some(&PropertyValue::Json(serde_json::json!({"a": 1}))));
    }

    #[test]
    fn property_spec_requires_colon() {
        assert!(parse_property_spec("title").is_err());
        let prop = parse_property_spec("title:text").unwrap();
        assert_eq!(prop.name, "title");
        assert_eq!(prop.data_type, PropertyDataType::Text);
    }
}
