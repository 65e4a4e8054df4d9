//! Field tree to schema synthesis.
//!
//! Synthesis is the second pass over an already assembled [`FieldTree`]: the
//! tree is only read, and every computed [`Schema`] is stored in a separate
//! map keyed by [`FieldId`].

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::field::{FieldId, FieldTree, classify_primitive, element_token};
use crate::types::Schema;

/// A documented default value that could not be represented in the
/// resolved schema and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedDefault {
    pub field: String,
    pub value: String,
}

/// Memoizing schema synthesizer over a borrowed [`FieldTree`].
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::{Field, FieldTree, SchemaSynthesizer};
///
/// let mut tree = FieldTree::new();
/// let tags = tree.push(Field::new("tags").with_type("[]string"));
///
/// let mut synth = SchemaSynthesizer::new(&tree);
/// let schema = synth.schema_of(tags);
/// let json = serde_json::to_value(&schema).unwrap();
/// assert_eq!(json["type"], "array");
/// assert_eq!(json["items"]["type"], "string");
/// ```
pub struct SchemaSynthesizer<'a> {
    tree: &'a FieldTree,
    cache: HashMap<FieldId, Schema>,
    in_progress: HashSet<FieldId>,
    dropped_defaults: Vec<DroppedDefault>,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(tree: &'a FieldTree) -> Self {
        Self {
            tree,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
            dropped_defaults: Vec::new(),
        }
    }

    /// Schema for one field, computed once and cached.
    pub fn schema_of(&mut self, id: FieldId) -> Schema {
        if let Some(schema) = self.cache.get(&id) {
            return schema.clone();
        }
        if !self.in_progress.insert(id) {
            warn!(field = %self.tree.get(id).name, "Field references itself; emitting empty object");
            return self.tag(id, Schema::empty_object());
        }

        let shape = self.shape_of(id);
        let schema = self.tag(id, shape);

        self.in_progress.remove(&id);
        self.cache.insert(id, schema.clone());
        schema
    }

    /// Object schema built from a list of child fields.
    ///
    /// A single child that is neither object-typed nor a primitive array
    /// collapses the wrapper into that child's schema. Otherwise each child
    /// becomes a property keyed by its name; on duplicate names the later
    /// child wins.
    pub fn object_schema(&mut self, children: &[FieldId]) -> Schema {
        if let [only] = children {
            let child = self.tree.get(*only);
            if !child.is_object_type() && !child.is_primitive_array_type() {
                return self.schema_of(*only);
            }
        }

        let mut properties = IndexMap::new();
        for child in children {
            let schema = self.schema_of(*child);
            let key = schema
                .name
                .clone()
                .unwrap_or_else(|| self.tree.get(*child).name.clone());
            properties.insert(key, schema);
        }
        Schema::object(properties)
    }

    /// Object schemas for every alternate child set recorded on `id`, keyed
    /// by the alternate set key.
    pub fn alternate_schemas(&mut self, id: FieldId) -> Vec<(String, Schema)> {
        let tree = self.tree;
        let field = tree.get(id);
        let sets: Vec<(String, Vec<FieldId>)> = field
            .alternate_child_sets
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        sets.into_iter()
            .map(|(key, children)| {
                let schema = self.object_schema(&children).with_name(key.clone());
                (key, schema)
            })
            .collect()
    }

    pub fn dropped_defaults(&self) -> &[DroppedDefault] {
        &self.dropped_defaults
    }

    /// Consumes the synthesizer, returning every computed schema.
    pub fn into_schemas(self) -> HashMap<FieldId, Schema> {
        self.cache
    }

    fn shape_of(&mut self, id: FieldId) -> Schema {
        let tree = self.tree;
        let field = tree.get(id);
        let token = field.resolved_type().into_owned();
        let children = field.children.clone();
        let raw_default = field.default_value.clone();

        if field.is_array_object() {
            let items = self.object_schema(&children);
            let default = self.json_default(id, raw_default.as_deref());
            return Schema::array(items).with_default(default);
        }

        if field.is_array_type() {
            let items = self.element_schema(&token, &children);
            let default = self.json_default(id, raw_default.as_deref());
            return Schema::array(items).with_default(default);
        }

        if field.is_map_type() {
            let values = self.element_schema(&token, &children);
            let default = self.json_default(id, raw_default.as_deref());
            return Schema::map(values).with_default(default);
        }

        if field.is_object_type() {
            let default = match raw_default.as_deref() {
                Some("{}") | None => None,
                Some(raw) => self.json_default(id, Some(raw)),
            };
            return self.object_schema(&children).with_default(default);
        }

        match classify_primitive(&token) {
            Some(kind) => {
                let default = raw_default.as_deref().and_then(|raw| {
                    let coerced = kind.coerce_default(raw);
                    if coerced.is_none() {
                        self.drop_default(id, raw);
                    }
                    coerced
                });
                Schema::primitive(kind).with_default(default)
            }
            None => self.object_schema(&children),
        }
    }

    fn element_schema(&mut self, token: &str, children: &[FieldId]) -> Schema {
        match classify_primitive(element_token(token)) {
            Some(kind) => Schema::primitive(kind),
            None => self.object_schema(children),
        }
    }

    fn json_default(&mut self, id: FieldId, raw: Option<&str>) -> Option<Value> {
        let raw = raw?;
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Some(value),
            Err(_) => {
                self.drop_default(id, raw);
                None
            }
        }
    }

    fn drop_default(&mut self, id: FieldId, raw: &str) {
        let tree = self.tree;
        let field = &tree.get(id).name;
        debug!(field = %field, value = raw, "Dropping default that does not fit the resolved type");
        self.dropped_defaults.push(DroppedDefault {
            field: field.clone(),
            value: raw.to_string(),
        });
    }

    fn tag(&self, id: FieldId, schema: Schema) -> Schema {
        let field = self.tree.get(id);
        let description = Some(field.description.as_str()).filter(|d| !d.is_empty());
        schema
            .with_name(field.name.clone())
            .with_description(description)
            .with_example(field.example.as_deref())
    }
}

/// Synthesizes schemas for `roots` and everything beneath them.
pub fn synthesize(tree: &FieldTree, roots: &[FieldId]) -> HashMap<FieldId, Schema> {
    let mut synth = SchemaSynthesizer::new(tree);
    for root in roots {
        synth.schema_of(*root);
    }
    synth.into_schemas()
}
