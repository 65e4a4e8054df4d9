//! Registry validation.
//!
//! Checks that a [`SchemaRegistry`] is self-contained: every reference
//! resolves to a registered schema. Reference cycles surface when a schema
//! is expanded with [`SchemaRegistry::expand`].
//!
//! # Examples
//!
//! ```
//! use apidoc_schema_core::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.insert("Root", Schema::array(Schema::reference("Missing")));
//! assert_eq!(
//!     validate_registry(&registry),
//!     vec![SchemaError::DanglingReference("Missing".into())]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::registry::SchemaRegistry;
use crate::types::{Schema, SchemaKind};

/// Schema registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A `$ref` names a schema that is not registered.
    #[error("dangling schema reference: {0}")]
    DanglingReference(String),
    /// Expanding references revisits a schema already being expanded.
    #[error("schema reference cycle detected at: {0}")]
    ReferenceCycle(String),
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Returns every dangling reference in the registry, each reported once, in
/// registry order.
pub fn validate_registry(registry: &SchemaRegistry) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut reported: HashSet<String> = HashSet::new();

    for (_, schema) in registry.iter() {
        collect_references(schema, &mut |name| {
            if !registry.contains(name) && reported.insert(name.to_string()) {
                errors.push(SchemaError::DanglingReference(name.to_string()));
            }
        });
    }

    errors
}

fn collect_references(schema: &Schema, visit: &mut impl FnMut(&str)) {
    match &schema.kind {
        SchemaKind::Ref(name) => visit(name),
        SchemaKind::Array(items) | SchemaKind::Map(items) => collect_references(items, visit),
        SchemaKind::Object(properties) => {
            for property in properties.values() {
                collect_references(property, visit);
            }
        }
        SchemaKind::Primitive(_) => {}
    }
}
