//! Documented fields and the arena that holds them.
//!
//! Fields decoded from documentation tables live in a [`FieldTree`] and are
//! addressed by stable [`FieldId`]s. Parent links are plain indices, so
//! walking to the nearest structural ancestor is a loop over the arena rather
//! than a pointer chase.

use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::types::PrimitiveKind;

/// Type tokens that always denote an object.
pub const OBJECT_TYPE_ALIASES: &[&str] = &["object", "struct", "strcut", "Json Object"];

/// Type token assigned when nothing else is known about a field.
pub const UNKNOWN_TYPE: &str = "struct";

/// Stable index of a field inside a [`FieldTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub usize);

/// Structural identity of a field: its name and resolved type token.
///
/// Two fields with the same identity describe the same logical shape even
/// when their descriptions or children differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub name: String,
    pub type_token: String,
}

/// One documented parameter or response property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    pub name: String,
    /// Type token as written in the document, if any.
    pub type_token: Option<String>,
    pub required: bool,
    pub description: String,
    pub default_value: Option<String>,
    pub example: Option<String>,
    pub max_length: Option<String>,
    /// Child fields in document order.
    pub children: Vec<FieldId>,
    /// Structurally different child sets seen for the same field, keyed by
    /// field name plus sequence number.
    pub alternate_child_sets: IndexMap<String, Vec<FieldId>>,
    pub parent: Option<FieldId>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_token: impl Into<String>) -> Self {
        self.type_token = Some(type_token.into());
        self
    }

    /// Resolves the type token without mutating the field.
    ///
    /// An explicit token wins. Otherwise the default value, then the example,
    /// decides: numeric literals give `number`, `true`/`false` give `bool`,
    /// anything else `string`. With no evidence at all the field is a
    /// `struct`.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_core::Field;
    ///
    /// let mut field = Field::new("page");
    /// field.default_value = Some("1".into());
    /// assert_eq!(field.resolved_type(), "number");
    ///
    /// assert_eq!(Field::new("data").resolved_type(), "struct");
    /// assert_eq!(Field::new("id").with_type("i64").resolved_type(), "i64");
    /// ```
    pub fn resolved_type(&self) -> Cow<'_, str> {
        if let Some(token) = &self.type_token {
            return Cow::Borrowed(token.as_str());
        }
        let inferred = [self.default_value.as_deref(), self.example.as_deref()]
            .into_iter()
            .flatten()
            .map(|value| {
                if is_numeric_literal(value) {
                    "number"
                } else if value.trim().eq_ignore_ascii_case("true")
                    || value.trim().eq_ignore_ascii_case("false")
                {
                    "bool"
                } else {
                    "string"
                }
            })
            .next()
            .unwrap_or(UNKNOWN_TYPE);
        Cow::Borrowed(inferred)
    }

    /// Stores the resolved type token on the field. Calling it again is a
    /// no-op.
    pub fn resolve_type(&mut self) -> &str {
        if self.type_token.is_none() {
            self.type_token = Some(self.resolved_type().into_owned());
        }
        self.type_token.as_deref().unwrap_or(UNKNOWN_TYPE)
    }

    pub fn key(&self) -> FieldKey {
        FieldKey {
            name: self.name.clone(),
            type_token: self.resolved_type().into_owned(),
        }
    }

    /// `true` for object aliases and for every token that is not a
    /// recognized primitive, so unknown types lean towards structure.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_core::Field;
    ///
    /// assert!(Field::new("data").with_type("UserInfo").is_object_type());
    /// assert!(Field::new("data").with_type("object").is_object_type());
    /// assert!(!Field::new("id").with_type("int").is_object_type());
    /// ```
    pub fn is_object_type(&self) -> bool {
        let token = self.resolved_type();
        is_object_alias(&token) || classify_primitive(&token).is_none()
    }

    pub fn is_array_type(&self) -> bool {
        is_array_token(&self.resolved_type())
    }

    pub fn is_map_type(&self) -> bool {
        is_map_token(&self.resolved_type())
    }

    /// Array whose element token is an object alias (`[]object`, `list<struct>`).
    pub fn is_array_object(&self) -> bool {
        let token = self.resolved_type();
        is_array_token(&token) && is_object_alias(element_token(&token))
    }

    /// Array whose element token resolves to a primitive.
    pub fn is_primitive_array_type(&self) -> bool {
        let token = self.resolved_type();
        is_array_token(&token) && classify_primitive(element_token(&token)).is_some()
    }

    pub fn is_array_or_object(&self) -> bool {
        self.is_array_type() || self.is_object_type()
    }

    pub fn is_binary_type(&self) -> bool {
        matches!(self.resolved_type().as_ref(), "binary" | "form-data")
    }
}

/// Maps a type token to a primitive kind, or `None` when the token is not a
/// primitive.
///
/// 64-bit spellings are checked before the generic `int` substring so that
/// `int64` is not read as a 32-bit integer.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::{PrimitiveKind, classify_primitive};
///
/// assert_eq!(classify_primitive("int64"), Some(PrimitiveKind::Int64));
/// assert_eq!(classify_primitive("int"), Some(PrimitiveKind::Int32));
/// assert_eq!(classify_primitive("Sting"), Some(PrimitiveKind::String));
/// assert_eq!(classify_primitive("form-data"), Some(PrimitiveKind::Binary));
/// assert_eq!(classify_primitive("UserInfo"), None);
/// ```
pub fn classify_primitive(token: &str) -> Option<PrimitiveKind> {
    let contains_any = |needles: &[&str]| needles.iter().any(|n| token.contains(n));
    if token.contains("bool") {
        Some(PrimitiveKind::Boolean)
    } else if token.eq_ignore_ascii_case("string") || token.eq_ignore_ascii_case("sting") {
        Some(PrimitiveKind::String)
    } else if contains_any(&["i64", "int64", "long"]) {
        Some(PrimitiveKind::Int64)
    } else if contains_any(&["int", "i32"]) {
        Some(PrimitiveKind::Int32)
    } else if contains_any(&["float", "double", "number"]) {
        Some(PrimitiveKind::Number)
    } else if matches!(token, "binary" | "form-data") {
        Some(PrimitiveKind::Binary)
    } else {
        None
    }
}

pub fn is_object_alias(token: &str) -> bool {
    OBJECT_TYPE_ALIASES.contains(&token)
}

pub fn is_array_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.contains("[]") || lower.contains("list") || lower.contains("array")
}

pub fn is_map_token(token: &str) -> bool {
    token
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("map"))
}

/// Element type of a container token: the last token between `[]<>(),`
/// that is not `list` or `array`, defaulting to `object`.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::element_token;
///
/// assert_eq!(element_token("[]string"), "string");
/// assert_eq!(element_token("List<Item>"), "Item");
/// assert_eq!(element_token("map<string,int64>"), "int64");
/// assert_eq!(element_token("array"), "object");
/// ```
pub fn element_token(token: &str) -> &str {
    token
        .split(['[', ']', '<', '>', '(', ')', ','])
        .map(str::trim)
        .filter(|part| {
            !part.is_empty()
                && !part.eq_ignore_ascii_case("list")
                && !part.eq_ignore_ascii_case("array")
        })
        .last()
        .unwrap_or("object")
}

/// Numeric literal test used for type inference: integers, decimals,
/// exponents and `0x` hex. `NaN` and `inf` spellings are rejected.
pub fn is_numeric_literal(value: &str) -> bool {
    let trimmed = value.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    trimmed.chars().any(|c| c.is_ascii_digit()) && trimmed.parse::<f64>().is_ok()
}

/// Arena of fields addressed by [`FieldId`].
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::{Field, FieldTree};
///
/// let mut tree = FieldTree::new();
/// let data = tree.push(Field::new("data").with_type("object"));
/// let wrapper = tree.push(Field::new("wrapper").with_type("int"));
/// let id = tree.push(Field::new("id").with_type("i64"));
/// tree.attach_child(data, wrapper);
/// tree.attach_child(wrapper, id);
///
/// // `wrapper` is not object-typed, so the structural parent of `id` is `data`.
/// assert_eq!(tree.structural_parent(id), Some(data));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldTree {
    nodes: Vec<Field>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: Field) -> FieldId {
        self.nodes.push(field);
        FieldId(self.nodes.len() - 1)
    }

    /// Returns the field for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn get(&self, id: FieldId) -> &Field {
        &self.nodes[id.0]
    }

    /// Mutable access to the field for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn get_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.nodes.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// Appends `child` under `parent` and records the back-link.
    pub fn attach_child(&mut self, parent: FieldId, child: FieldId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Replaces the children of `parent`. Children that have no parent yet
    /// get `parent` as their back-link; already linked children keep theirs.
    pub fn set_children(&mut self, parent: FieldId, children: Vec<FieldId>) {
        for child in &children {
            let node = &mut self.nodes[child.0];
            if node.parent.is_none() {
                node.parent = Some(parent);
            }
        }
        self.nodes[parent.0].children = children;
    }

    /// Records an alternate child set for `id` and returns its key
    /// (`<name><n>`, numbered from 1).
    pub fn add_alternate_child_set(&mut self, id: FieldId, children: Vec<FieldId>) -> String {
        let node = &mut self.nodes[id.0];
        let key = format!("{}{}", node.name, node.alternate_child_sets.len() + 1);
        node.alternate_child_sets.insert(key.clone(), children);
        key
    }

    /// Nearest ancestor that is itself object-typed, skipping scalar
    /// wrappers.
    pub fn structural_parent(&self, id: FieldId) -> Option<FieldId> {
        let mut current = self.nodes[id.0].parent;
        let mut seen = HashSet::new();
        while let Some(parent) = current {
            if !seen.insert(parent) {
                return None;
            }
            let node = &self.nodes[parent.0];
            if node.is_object_type() {
                return Some(parent);
            }
            current = node.parent;
        }
        None
    }

    pub fn is_root_object(&self, id: FieldId) -> bool {
        self.structural_parent(id).is_none()
    }

    /// Dotted path of `id` through its structural ancestors, with `[0]`
    /// appended to array segments (e.g. `data.list[0].id`).
    pub fn full_name(&self, id: FieldId) -> String {
        let mut segments = vec![self.path_segment(id)];
        let mut current = self.structural_parent(id);
        let mut seen = HashSet::new();
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            segments.push(self.path_segment(parent));
            current = self.structural_parent(parent);
        }
        segments.reverse();
        segments.join(".")
    }

    fn path_segment(&self, id: FieldId) -> String {
        let node = &self.nodes[id.0];
        if node.is_array_type() {
            format!("{}[0]", node.name)
        } else {
            node.name.clone()
        }
    }

    /// `id` followed by every field reachable through children, pre-order,
    /// each visited once.
    pub fn descendants(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            for child in self.nodes[current.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Returns `true` when `target` is reachable from `from` through child
    /// links (including `from == target`).
    pub fn reaches(&self, from: FieldId, target: FieldId) -> bool {
        self.descendants(from).contains(&target)
    }

    /// Compares two child lists by structural identity, element-wise.
    pub fn same_children(&self, a: &[FieldId], b: &[FieldId]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| self.get(*x).key() == self.get(*y).key())
    }
}
