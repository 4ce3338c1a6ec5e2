pub mod loader;
pub mod mapping;
pub mod types;

pub use loader::{SchemaLoader, SchemaProvider, SchemaRegistry};
pub use mapping::{base_type_for_solr_type, coerce};
pub use types::{BaseType, FieldDefinition, Schema};
