//! Declarative response schemas: rendered into the hosted service's
//! response-schema JSON on the way out, and enforced against replies on the
//! way back in.

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub enum Schema {
    String { description: Option<String> },
    Number { description: Option<String> },
    Array { items: Box<Schema> },
    Object { properties: Vec<(String, Schema)>, required: Vec<String> },
}

impl Schema {
    pub fn string() -> Self {
        Schema::String { description: None }
    }

    pub fn string_described(description: &str) -> Self {
        Schema::String {
            description: Some(description.to_string()),
        }
    }

    pub fn number() -> Self {
        Schema::Number { description: None }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
        }
    }

    pub fn object(properties: Vec<(&str, Schema)>, required: &[&str]) -> Self {
        Schema::Object {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            required: required.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Render as the service's response-schema JSON (uppercase type tags).
    pub fn to_value(&self) -> Value {
        match self {
            Schema::String { description } => tagged("STRING", description),
            Schema::Number { description } => tagged("NUMBER", description),
            Schema::Array { items } => json!({
                "type": "ARRAY",
                "items": items.to_value(),
            }),
            Schema::Object {
                properties,
                required,
            } => {
                let props: serde_json::Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_value()))
                    .collect();
                json!({
                    "type": "OBJECT",
                    "properties": props,
                    "required": required,
                })
            }
        }
    }

    /// Strict structural check of a reply. Every required field must be
    /// present with the declared type; nothing is coerced.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Schema::String { .. } => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {value}"))
                }
            }
            Schema::Number { .. } => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected number, got {value}"))
                }
            }
            Schema::Array { items } => {
                let array = value
                    .as_array()
                    .ok_or_else(|| format!("expected array, got {value}"))?;
                for (index, element) in array.iter().enumerate() {
                    items
                        .validate(element)
                        .map_err(|e| format!("element {index}: {e}"))?;
                }
                Ok(())
            }
            Schema::Object {
                properties,
                required,
            } => {
                let object = value
                    .as_object()
                    .ok_or_else(|| format!("expected object, got {value}"))?;
                for name in required {
                    if !object.contains_key(name) {
                        return Err(format!("missing required field '{name}'"));
                    }
                }
                for (name, schema) in properties {
                    if let Some(field) = object.get(name) {
                        schema
                            .validate(field)
                            .map_err(|e| format!("field '{name}': {e}"))?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn tagged(tag: &str, description: &Option<String>) -> Value {
    match description {
        Some(text) => json!({ "type": tag, "description": text }),
        None => json!({ "type": tag }),
    }
}
