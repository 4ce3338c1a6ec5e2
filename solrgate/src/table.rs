//! Typed tabular results shaped by a caller [`Schema`]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::schema::{coerce, Schema};
use crate::{Error, Result};

/// A value typed according to its column's base type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Json(Value),
}

impl TypedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Render the value the way Solr expects it in an update request
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Json(v) => v.clone(),
        }
    }
}

/// One table row. Only set fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: HashMap<String, TypedValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: TypedValue) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a table from loosely-typed JSON objects, coercing every schema
    /// field and failing on the first value that does not fit.
    pub fn from_json_rows(schema: Schema, objects: &[Map<String, Value>]) -> Result<Self> {
        let mut table = Self::new(schema);
        for object in objects {
            let mut row = Row::new();
            for field in table.schema.fields() {
                let Some(raw) = object.get(&field.name) else {
                    continue;
                };
                let value = coerce(raw, field.base_type).map_err(|reason| Error::Coercion {
                    field: field.name.clone(),
                    base_type: field.base_type,
                    reason,
                })?;
                if let Some(value) = value {
                    row.set(field.name.clone(), value);
                }
            }
            table.push_row(row);
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows for which `keep` returns true
    pub fn retain(&mut self, keep: impl FnMut(&Row) -> bool) {
        self.rows.retain(keep);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// Rows as JSON field maps, schema fields only, unset fields omitted
    pub fn to_documents(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.schema
                    .fields()
                    .iter()
                    .filter_map(|f| row.get(&f.name).map(|v| (f.name.clone(), v.to_json())))
                    .collect()
            })
            .collect()
    }
}
