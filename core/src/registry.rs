//! Per-document schema registry and reference extraction.
//!
//! [`SchemaRegistry`] plays the role of OpenAPI `components.schemas` for one
//! document. [`SchemaRegistry::promote_properties`] walks an object schema,
//! moves every nested object (or array-of-object item) schema into the
//! registry under `<prefix><UpperCamelName>`, and rewrites the original
//! location into a reference. Schemas that differ only in their top-level
//! display metadata share one entry; each reference keeps the metadata of
//! its own site.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Schema, SchemaKind};
use crate::validate::{Result, SchemaError, validate_registry};

/// Property names promoted under their own name instead of a prefixed one,
/// so every endpoint shares a single definition.
pub const DEFAULT_SHARED_ALIASES: &[&str] = &["extra"];

/// Named schema registry scoped to one document.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::*;
/// use indexmap::IndexMap;
///
/// let mut user = IndexMap::new();
/// user.insert("uid".to_string(), Schema::primitive(PrimitiveKind::Int64));
/// let mut root = IndexMap::new();
/// root.insert("user_info".to_string(), Schema::object(user));
/// let mut root = Schema::object(root);
///
/// let mut registry = SchemaRegistry::new();
/// registry.promote_properties("OauthToken", &mut root);
///
/// assert!(registry.contains("OauthTokenUserInfo"));
/// assert_eq!(
///     root.properties().unwrap()["user_info"].reference_name(),
///     Some("OauthTokenUserInfo")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
    shared_aliases: Vec<String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::with_shared_aliases(DEFAULT_SHARED_ALIASES.iter().map(|s| s.to_string()))
    }

    pub fn with_shared_aliases(aliases: impl IntoIterator<Item = String>) -> Self {
        Self {
            schemas: IndexMap::new(),
            shared_aliases: aliases.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts or replaces an entry, keeping the original position on
    /// replacement.
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) -> Option<Schema> {
        self.schemas.insert(name.into(), schema)
    }

    pub fn into_inner(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    /// Rewrites every promotable property of `parent` (recursively) into a
    /// reference to a registry entry.
    ///
    /// Primitive, primitive-array, map and empty-object properties stay
    /// inline.
    pub fn promote_properties(&mut self, prefix: &str, parent: &mut Schema) {
        let Some(properties) = parent.properties_mut() else {
            return;
        };
        let taken = std::mem::take(properties);
        let rewritten = taken
            .into_iter()
            .map(|(name, schema)| {
                let schema = self.extract(prefix, &name, schema);
                (name, schema)
            })
            .collect();
        *properties = rewritten;
    }

    /// Registers a promotable schema under the key derived from
    /// `property_name` and returns the schema that should replace it in
    /// place: a reference for objects, an array of references for arrays.
    ///
    /// The returned reference carries the site's name, description, example
    /// and default, so [`expand`](Self::expand) restores them exactly.
    pub fn extract(&mut self, prefix: &str, property_name: &str, schema: Schema) -> Schema {
        if !schema.is_promotable() {
            return schema;
        }

        match schema.kind {
            SchemaKind::Array(items) => Schema {
                kind: SchemaKind::Array(Box::new(self.promote_definition(
                    prefix,
                    property_name,
                    *items,
                ))),
                ..schema
            },
            _ => self.promote_definition(prefix, property_name, schema),
        }
    }

    fn promote_definition(
        &mut self,
        prefix: &str,
        property_name: &str,
        mut definition: Schema,
    ) -> Schema {
        self.promote_properties(prefix, &mut definition);
        let name = definition.name.clone();
        let description = definition.description.clone();
        let example = definition.example.clone();
        let default = definition.default.clone();
        Schema {
            kind: SchemaKind::Ref(self.register(prefix, property_name, definition)),
            name,
            description,
            example,
            default,
        }
    }

    /// Registers `candidate` under `<prefix><UpperCamel(property_name)>` (or
    /// the bare name for shared aliases) and returns the key used.
    ///
    /// An existing entry is reused when its kind, including every nested
    /// property and its metadata, equals the candidate's; only top-level
    /// metadata may differ. Anything else under the same key is registered
    /// with a numeric suffix instead of replacing the existing entry.
    pub fn register(&mut self, prefix: &str, property_name: &str, candidate: Schema) -> String {
        let base = self.key_for(prefix, property_name);
        let mut key = base.clone();
        let mut sequence = 1;
        loop {
            match self.schemas.get(&key) {
                None => {
                    debug!(schema = %key, "Registering promoted schema");
                    self.schemas.insert(key.clone(), candidate);
                    return key;
                }
                Some(existing) if existing.kind == candidate.kind => {
                    debug!(schema = %key, "Reusing structurally equal schema");
                    return key;
                }
                Some(_) => {
                    if sequence == 1 && self.is_shared_alias(property_name) {
                        warn!(
                            schema = %base,
                            "Shared schema redefined with a different shape, registering under a suffixed key"
                        );
                    }
                    sequence += 1;
                    key = format!("{base}{sequence}");
                }
            }
        }
    }

    /// Registry key for a property under `prefix`.
    pub fn key_for(&self, prefix: &str, property_name: &str) -> String {
        if self.is_shared_alias(property_name) {
            property_name.to_string()
        } else {
            format!("{prefix}{}", upper_camel(property_name))
        }
    }

    fn is_shared_alias(&self, property_name: &str) -> bool {
        self.shared_aliases.iter().any(|alias| alias == property_name)
    }

    /// Returns `schema` with every reference replaced by the registered
    /// schema it names, recursively. A reference's own name, description,
    /// example and default replace those of the schema it names.
    pub fn expand(&self, schema: &Schema) -> Result<Schema> {
        let mut active = HashSet::new();
        self.expand_inner(schema, &mut active)
    }

    fn expand_inner(&self, schema: &Schema, active: &mut HashSet<String>) -> Result<Schema> {
        match &schema.kind {
            SchemaKind::Ref(name) => {
                let target = self
                    .schemas
                    .get(name)
                    .ok_or_else(|| SchemaError::DanglingReference(name.clone()))?;
                if !active.insert(name.clone()) {
                    return Err(SchemaError::ReferenceCycle(name.clone()));
                }
                let expanded = self.expand_inner(target, active);
                active.remove(name);
                Ok(Schema {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    example: schema.example.clone(),
                    default: schema.default.clone(),
                    ..expanded?
                })
            }
            SchemaKind::Array(items) => {
                let mut out = schema.clone();
                out.kind = SchemaKind::Array(Box::new(self.expand_inner(items, active)?));
                Ok(out)
            }
            SchemaKind::Map(values) => {
                let mut out = schema.clone();
                out.kind = SchemaKind::Map(Box::new(self.expand_inner(values, active)?));
                Ok(out)
            }
            SchemaKind::Object(properties) => {
                let mut expanded = IndexMap::with_capacity(properties.len());
                for (key, property) in properties {
                    expanded.insert(key.clone(), self.expand_inner(property, active)?);
                }
                let mut out = schema.clone();
                out.kind = SchemaKind::Object(expanded);
                Ok(out)
            }
            SchemaKind::Primitive(_) => Ok(schema.clone()),
        }
    }

    /// Dangling references across all registered schemas.
    pub fn validate(&self) -> Vec<SchemaError> {
        validate_registry(self)
    }

    /// The registry as an OpenAPI `components.schemas` JSON object.
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for SchemaRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.schemas.serialize(serializer)
    }
}

/// Converts `snake_case`, `kebab-case` or `camelCase` text into
/// `UpperCamelCase`. Characters inside a word keep their case.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::upper_camel;
///
/// assert_eq!(upper_camel("user_info"), "UserInfo");
/// assert_eq!(upper_camel("itemList"), "ItemList");
/// assert_eq!(upper_camel("access-token"), "AccessToken");
/// ```
pub fn upper_camel(text: &str) -> String {
    text.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Schema prefix for an endpoint path: the last `segments` non-empty path
/// segments joined with `_`, in upper camel case.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::schema_prefix;
///
/// assert_eq!(schema_prefix("/oauth/access_token/", 2), "OauthAccessToken");
/// assert_eq!(schema_prefix("/api/apps/v2/jscode2session", 2), "V2Jscode2session");
/// assert_eq!(schema_prefix("", 2), "");
/// ```
pub fn schema_prefix(path: &str, segments: usize) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let start = parts.len().saturating_sub(segments);
    upper_camel(&parts[start..].join("_"))
}
