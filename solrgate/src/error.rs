use thiserror::Error;

use crate::schema::BaseType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not execute query because a schema was not specified")]
    MissingSchema,

    #[error("Could not execute query because the schema does not exist [{0}]")]
    SchemaNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot coerce field '{field}' to {base_type}: {reason}")]
    Coercion {
        field: String,
        base_type: BaseType,
        reason: String,
    },

    #[error("Solr error (status {status}): {message}")]
    Engine { status: u16, message: String },

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure came from executing a query against the engine,
    /// as opposed to caller input or schema lookup.
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            Self::Engine { .. }
                | Self::Timeout(_)
                | Self::Http(_)
                | Self::InvalidUrl(_)
                | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
