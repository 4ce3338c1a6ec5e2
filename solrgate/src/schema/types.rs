use serde::{Deserialize, Serialize};
use std::fmt;

/// Base types a caller schema can declare for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BaseType {
    Boolean,
    Number,
    Integer,
    Long,
    String,
    Text,
    #[serde(alias = "DATE")]
    Datetime,
    Json,
    Query,
    Infotable,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::String => "STRING",
            Self::Text => "TEXT",
            Self::Datetime => "DATETIME",
            Self::Json => "JSON",
            Self::Query => "QUERY",
            Self::Infotable => "INFOTABLE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub base_type: BaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            name: name.into(),
            base_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered field catalogue used to shape results.
///
/// Field names are unique and insertion order is column order. Fields can be
/// added but never replaced or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Build a schema from a field list, keeping the first definition of any
    /// duplicated name.
    pub fn with_fields(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        let mut schema = Self::new(name);
        for field in fields {
            schema.add_field(field);
        }
        schema
    }

    /// Append a field. Returns false (and leaves the schema untouched) when a
    /// field with the same name already exists.
    pub fn add_field(&mut self, field: FieldDefinition) -> bool {
        if self.has_field(&field.name) {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
