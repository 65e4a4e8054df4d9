//! Field lists embedded as JSON in a `data` attribute.
//!
//! Payloads look like `{"fields": [...]}` or `{"data": [...]}`; each entry
//! is a field with optional nested `children` (or `fields`).

use apidoc_schema_core::{Field, FieldId, FieldTree};
use serde::Deserialize;
use serde_json::Value;

use super::decode::apply_field_rules;
use crate::config::ParserConfig;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(alias = "data")]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(default, alias = "key")]
    name: String,
    #[serde(default, rename = "type")]
    type_token: Option<String>,
    #[serde(default)]
    required: Option<Value>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default, rename = "defV")]
    default_value: Option<Value>,
    #[serde(default, rename = "maxLength")]
    max_length: Option<Value>,
    #[serde(default)]
    example: Option<Value>,
    #[serde(default, alias = "fields")]
    children: Vec<RawField>,
}

/// Imports an embedded field list into `tree` and returns the top-level
/// fields. Entries without a name are skipped together with their children.
///
/// # Errors
///
/// Returns [`Json`](crate::DiscoveryError::Json) when the payload is not a
/// field list.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::FieldTree;
/// use apidoc_schema_discovery::ParserConfig;
/// use apidoc_schema_discovery::parser::embedded::import_fields;
///
/// let payload = r#"{"fields":[{"key":"data","type":"object","children":[
///     {"name":"open_id","type":"string","required":true}
/// ]}]}"#;
/// let mut tree = FieldTree::new();
/// let roots = import_fields(payload, &mut tree, &ParserConfig::default()).unwrap();
///
/// let data = tree.get(roots[0]);
/// assert_eq!(data.name, "data");
/// assert!(tree.get(data.children[0]).required);
/// ```
pub fn import_fields(payload: &str, tree: &mut FieldTree, config: &ParserConfig) -> Result<Vec<FieldId>> {
    let payload: Payload = serde_json::from_str(payload)?;
    Ok(payload
        .fields
        .into_iter()
        .filter_map(|raw| import_one(raw, tree, config))
        .collect())
}

fn import_one(raw: RawField, tree: &mut FieldTree, config: &ParserConfig) -> Option<FieldId> {
    let name = raw.name.trim();
    if name.is_empty() {
        return None;
    }

    let mut field = Field::new(name);
    field.type_token = raw.type_token.filter(|t| !t.trim().is_empty());
    field.required = raw.required.as_ref().is_some_and(is_truthy);
    field.description = raw.desc.unwrap_or_default();
    field.default_value = raw.default_value.as_ref().and_then(scalar_text);
    field.max_length = raw.max_length.as_ref().and_then(scalar_text);
    field.example = raw.example.as_ref().and_then(scalar_text);
    apply_field_rules(&mut field, config);

    let id = tree.push(field);
    for child in raw.children {
        if let Some(child_id) = import_one(child, tree, config) {
            tree.attach_child(id, child_id);
        }
    }
    Some(id)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == "是" || text.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Text form of a scalar; empty strings and `null` give `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
