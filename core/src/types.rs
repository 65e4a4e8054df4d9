//! Schema node definitions.
//!
//! A [`Schema`] is the normalized shape of one documented field: a primitive,
//! an array, an object with ordered properties, a map, or a reference into a
//! [`SchemaRegistry`](crate::SchemaRegistry). Serialization emits the subset
//! of the OpenAPI Schema Object this crate produces (`type`, `format`,
//! `properties`, `items`, `additionalProperties`, `$ref`, `default`,
//! `description`, `example`).

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// JSON pointer prefix used when rendering references.
pub const COMPONENTS_SCHEMAS_PREFIX: &str = "#/components/schemas/";

/// Scalar shapes a field can resolve to.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::PrimitiveKind;
///
/// assert_eq!(PrimitiveKind::Int64.openapi_type(), "integer");
/// assert_eq!(PrimitiveKind::Int64.format(), Some("int64"));
/// assert_eq!(PrimitiveKind::Binary.format(), Some("binary"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    String,
    Int32,
    Int64,
    Number,
    /// File upload or raw bytes (`binary`, `form-data`).
    Binary,
}

impl PrimitiveKind {
    /// OpenAPI `type` keyword for this primitive.
    pub fn openapi_type(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String | Self::Binary => "string",
            Self::Int32 | Self::Int64 => "integer",
            Self::Number => "number",
        }
    }

    /// OpenAPI `format` keyword, when one applies.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            Self::Int32 => Some("int32"),
            Self::Int64 => Some("int64"),
            Self::Number => Some("double"),
            Self::Binary => Some("binary"),
            Self::Boolean | Self::String => None,
        }
    }

    /// Parses a documented default value into this primitive's JSON
    /// representation.
    ///
    /// Returns `None` when the raw text cannot be represented, in which case
    /// the default is dropped rather than reported as an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_core::PrimitiveKind;
    /// use serde_json::json;
    ///
    /// assert_eq!(PrimitiveKind::Int32.coerce_default("10"), Some(json!(10)));
    /// assert_eq!(PrimitiveKind::Int32.coerce_default("ten"), None);
    /// assert_eq!(PrimitiveKind::Boolean.coerce_default("TRUE"), Some(json!(true)));
    /// assert_eq!(PrimitiveKind::String.coerce_default("abc"), Some(json!("abc")));
    /// ```
    pub fn coerce_default(&self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            Self::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            Self::String => Some(Value::String(raw.to_string())),
            Self::Int32 => trimmed.parse::<i32>().ok().map(Value::from),
            Self::Int64 => trimmed.parse::<i64>().ok().map(Value::from),
            Self::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Self::Binary => None,
        }
    }
}

/// Structural kind of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Primitive(PrimitiveKind),
    Array(Box<Schema>),
    /// Properties in document order.
    Object(IndexMap<String, Schema>),
    /// String-keyed map; the boxed schema describes the values.
    Map(Box<Schema>),
    /// Reference to a registry entry by name.
    Ref(String),
}

/// A synthesized schema node with display metadata.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::{PrimitiveKind, Schema};
///
/// let tags = Schema::array(Schema::primitive(PrimitiveKind::String))
///     .with_name("tags")
///     .with_description(Some("labels"));
/// let json = serde_json::to_value(&tags).unwrap();
/// assert_eq!(json["type"], "array");
/// assert_eq!(json["items"]["type"], "string");
/// assert_eq!(json["description"], "labels");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    /// Field name the schema was synthesized from. Not serialized.
    pub name: Option<String>,
    pub description: Option<String>,
    pub example: Option<String>,
    pub default: Option<Value>,
}

impl Schema {
    fn from_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            name: None,
            description: None,
            example: None,
            default: None,
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::from_kind(SchemaKind::Primitive(kind))
    }

    pub fn array(items: Schema) -> Self {
        Self::from_kind(SchemaKind::Array(Box::new(items)))
    }

    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Self::from_kind(SchemaKind::Object(properties))
    }

    pub fn empty_object() -> Self {
        Self::object(IndexMap::new())
    }

    pub fn map(values: Schema) -> Self {
        Self::from_kind(SchemaKind::Map(Box::new(values)))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::from_kind(SchemaKind::Ref(name.into()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    pub fn with_example(mut self, example: Option<&str>) -> Self {
        self.example = example.map(str::to_string);
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Object properties, if this is an object schema.
    pub fn properties(&self) -> Option<&IndexMap<String, Schema>> {
        match &self.kind {
            SchemaKind::Object(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn properties_mut(&mut self) -> Option<&mut IndexMap<String, Schema>> {
        match &mut self.kind {
            SchemaKind::Object(properties) => Some(properties),
            _ => None,
        }
    }

    /// Array item schema, if this is an array schema.
    pub fn items(&self) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Referenced registry name, if this is a reference.
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` when this schema, or its array item schema, carries a
    /// non-empty property map and is therefore eligible for promotion into a
    /// registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_core::{PrimitiveKind, Schema};
    /// use indexmap::IndexMap;
    ///
    /// let mut properties = IndexMap::new();
    /// properties.insert("id".to_string(), Schema::primitive(PrimitiveKind::Int64));
    /// assert!(Schema::array(Schema::object(properties)).is_promotable());
    /// assert!(!Schema::array(Schema::primitive(PrimitiveKind::String)).is_promotable());
    /// assert!(!Schema::empty_object().is_promotable());
    /// ```
    pub fn is_promotable(&self) -> bool {
        let target = self.items().unwrap_or(self);
        target.properties().is_some_and(|p| !p.is_empty())
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.kind {
            SchemaKind::Ref(name) => {
                map.serialize_entry("$ref", &format!("{COMPONENTS_SCHEMAS_PREFIX}{name}"))?;
            }
            SchemaKind::Primitive(kind) => {
                map.serialize_entry("type", kind.openapi_type())?;
                if let Some(format) = kind.format() {
                    map.serialize_entry("format", format)?;
                }
            }
            SchemaKind::Array(items) => {
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items.as_ref())?;
            }
            SchemaKind::Object(properties) => {
                map.serialize_entry("type", "object")?;
                if !properties.is_empty() {
                    map.serialize_entry("properties", properties)?;
                }
            }
            SchemaKind::Map(values) => {
                map.serialize_entry("type", "object")?;
                map.serialize_entry("additionalProperties", values.as_ref())?;
            }
        }
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(example) = &self.example {
            map.serialize_entry("example", example)?;
        }
        map.end()
    }
}
