//! Core field and schema model for API documentation extraction.
//!
//! This crate turns documented request and response fields into OpenAPI
//! schema fragments:
//!
//! - [`Field`] and [`FieldTree`]: decoded documentation rows arranged into a
//!   parent/child arena addressed by [`FieldId`].
//! - [`Schema`]: the normalized shape of one field (primitive, array, object,
//!   map or reference).
//! - [`SchemaSynthesizer`] / [`synthesize`]: derive a [`Schema`] for every
//!   field reachable from a set of roots.
//! - [`SchemaRegistry`]: per-document `components.schemas` with structural
//!   deduplication of promoted nested objects.
//!
//! Validation ([`validate_registry`]) reports references that do not resolve.
//!
//! # Example
//!
//! ```
//! use apidoc_schema_core::*;
//!
//! let mut tree = FieldTree::new();
//! let data = tree.push(Field::new("data").with_type("object"));
//! let user = tree.push(Field::new("user").with_type("object"));
//! let uid = tree.push(Field::new("uid").with_type("int64"));
//! let name = tree.push(Field::new("name").with_type("string"));
//! tree.attach_child(data, user);
//! tree.attach_child(user, uid);
//! tree.attach_child(user, name);
//!
//! let mut synth = SchemaSynthesizer::new(&tree);
//! let mut root = synth.object_schema(&[data]);
//!
//! let mut registry = SchemaRegistry::new();
//! registry.promote_properties("OauthToken", &mut root);
//!
//! assert!(registry.contains("OauthTokenData"));
//! assert!(registry.contains("OauthTokenUser"));
//! assert!(validate_registry(&registry).is_empty());
//! ```

mod field;
mod registry;
mod synth;
mod types;
mod validate;

pub use field::*;
pub use registry::{DEFAULT_SHARED_ALIASES, SchemaRegistry, schema_prefix, upper_camel};
pub use synth::{DroppedDefault, SchemaSynthesizer, synthesize};
pub use types::*;
pub use validate::{Result, SchemaError, validate_registry};
