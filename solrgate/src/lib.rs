pub mod config;
pub mod connector;
pub mod error;
pub mod mapper;
pub mod query;
pub mod schema;
pub mod sync;
pub mod table;
pub mod telemetry;
pub mod transport;

pub use config::Config;
pub use connector::SolrConnector;
pub use error::{Error, Result};
pub use schema::{BaseType, FieldDefinition, Schema, SchemaProvider, SchemaRegistry};
pub use table::{Row, Table, TypedValue};
