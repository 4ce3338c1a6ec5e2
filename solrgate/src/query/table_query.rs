//! Post-fetch filtering and sorting over an already-mapped [`Table`]
//!
//! The JSON form mirrors the structured query objects callers already send:
//!
//! ```json
//! {
//!   "filters": {"type": "And", "filters": [
//!     {"type": "GT", "fieldName": "price", "value": 10},
//!     {"type": "LIKE", "fieldName": "name", "value": "wid*"}
//!   ]},
//!   "sorts": [{"fieldName": "price", "isAscending": false}]
//! }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use super::types::SortClause;
use crate::table::{Row, Table, TypedValue};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TableQuery {
    #[serde(default)]
    pub filters: Option<Filter>,
    #[serde(default)]
    pub sorts: Vec<SortClause>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Filter {
    #[serde(rename = "And", alias = "AND", alias = "and")]
    And { filters: Vec<Filter> },
    #[serde(rename = "Or", alias = "OR", alias = "or")]
    Or { filters: Vec<Filter> },
    #[serde(rename = "EQ", alias = "eq")]
    Eq {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "NE", alias = "ne")]
    Ne {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "GT", alias = "gt")]
    Gt {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "GE", alias = "ge")]
    Ge {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "LT", alias = "lt")]
    Lt {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "LE", alias = "le")]
    Le {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: Value,
    },
    #[serde(rename = "Between", alias = "BETWEEN")]
    Between {
        #[serde(rename = "fieldName")]
        field_name: String,
        from: Value,
        to: Value,
    },
    #[serde(rename = "NotBetween", alias = "NOTBETWEEN")]
    NotBetween {
        #[serde(rename = "fieldName")]
        field_name: String,
        from: Value,
        to: Value,
    },
    #[serde(rename = "LIKE", alias = "Like")]
    Like {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: String,
    },
    #[serde(rename = "NotLike", alias = "NOTLIKE")]
    NotLike {
        #[serde(rename = "fieldName")]
        field_name: String,
        value: String,
    },
    #[serde(rename = "IN", alias = "In")]
    In {
        #[serde(rename = "fieldName")]
        field_name: String,
        values: Vec<Value>,
    },
    #[serde(rename = "NotIn", alias = "NOTIN")]
    NotIn {
        #[serde(rename = "fieldName")]
        field_name: String,
        values: Vec<Value>,
    },
    #[serde(rename = "MissingValue", alias = "MISSINGVALUE")]
    MissingValue {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
    #[serde(rename = "NotMissingValue", alias = "NOTMISSINGVALUE")]
    NotMissingValue {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
}

impl TableQuery {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Filter then sort `table` in place
    pub fn apply(&self, table: &mut Table) -> Result<()> {
        if let Some(filter) = &self.filters {
            let compiled = CompiledFilter::compile(filter)?;
            table.retain(|row| compiled.matches(row));
        }

        if !self.sorts.is_empty() {
            // Stable sort keeps engine order among equal keys
            table.rows_mut().sort_by(|a, b| {
                for clause in &self.sorts {
                    let ord = compare_optional(
                        a.get(&clause.field_name),
                        b.get(&clause.field_name),
                        clause.ascending,
                    );
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(())
    }
}

/// Filter with LIKE patterns turned into regexes up front
enum CompiledFilter<'a> {
    All(Vec<CompiledFilter<'a>>),
    Any(Vec<CompiledFilter<'a>>),
    Pattern {
        field_name: &'a str,
        regex: Regex,
        negate: bool,
    },
    Plain(&'a Filter),
}

impl<'a> CompiledFilter<'a> {
    fn compile(filter: &'a Filter) -> Result<Self> {
        Ok(match filter {
            Filter::And { filters } => Self::All(
                filters.iter().map(Self::compile).collect::<Result<Vec<_>>>()?,
            ),
            Filter::Or { filters } => Self::Any(
                filters.iter().map(Self::compile).collect::<Result<Vec<_>>>()?,
            ),
            Filter::Like { field_name, value } => Self::Pattern {
                field_name,
                regex: like_regex(value)?,
                negate: false,
            },
            Filter::NotLike { field_name, value } => Self::Pattern {
                field_name,
                regex: like_regex(value)?,
                negate: true,
            },
            other => Self::Plain(other),
        })
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(row)),
            Self::Pattern {
                field_name,
                regex,
                negate,
            } => {
                let hit = row
                    .get(field_name)
                    .map(display_value)
                    .is_some_and(|text| regex.is_match(&text));
                hit != *negate
            }
            Self::Plain(filter) => matches_plain(filter, row),
        }
    }
}

fn matches_plain(filter: &Filter, row: &Row) -> bool {
    let cmp = |field: &str, value: &Value| row.get(field).and_then(|v| compare_to_json(v, value));

    match filter {
        Filter::Eq { field_name, value } => cmp(field_name, value) == Some(Ordering::Equal),
        Filter::Ne { field_name, value } => cmp(field_name, value) != Some(Ordering::Equal),
        Filter::Gt { field_name, value } => cmp(field_name, value) == Some(Ordering::Greater),
        Filter::Ge { field_name, value } => matches!(
            cmp(field_name, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Filter::Lt { field_name, value } => cmp(field_name, value) == Some(Ordering::Less),
        Filter::Le { field_name, value } => matches!(
            cmp(field_name, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Filter::Between {
            field_name,
            from,
            to,
        } => in_range(cmp(field_name, from), cmp(field_name, to)),
        Filter::NotBetween {
            field_name,
            from,
            to,
        } => row.contains(field_name) && !in_range(cmp(field_name, from), cmp(field_name, to)),
        Filter::In { field_name, values } => values
            .iter()
            .any(|v| cmp(field_name, v) == Some(Ordering::Equal)),
        Filter::NotIn { field_name, values } => !values
            .iter()
            .any(|v| cmp(field_name, v) == Some(Ordering::Equal)),
        Filter::MissingValue { field_name } => !row.contains(field_name),
        Filter::NotMissingValue { field_name } => row.contains(field_name),
        // Compiled separately
        Filter::And { .. } | Filter::Or { .. } | Filter::Like { .. } | Filter::NotLike { .. } => {
            false
        }
    }
}

fn in_range(lower: Option<Ordering>, upper: Option<Ordering>) -> bool {
    matches!(lower, Some(Ordering::Greater | Ordering::Equal))
        && matches!(upper, Some(Ordering::Less | Ordering::Equal))
}

/// `*`/`%` match any run of characters, `?`/`_` match one; case-insensitive
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '*' | '%' => expr.push_str(".*"),
            '?' | '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| Error::InvalidInput(format!("bad LIKE pattern '{}': {}", pattern, e)))
}

fn display_value(value: &TypedValue) -> String {
    match value {
        TypedValue::String(s) => s.clone(),
        other => match other.to_json() {
            Value::String(s) => s,
            json => json.to_string(),
        },
    }
}

/// Compare a typed cell against a JSON literal from a filter
fn compare_to_json(cell: &TypedValue, literal: &Value) -> Option<Ordering> {
    match cell {
        TypedValue::Number(_) | TypedValue::Integer(_) => {
            let lhs = cell.as_f64()?;
            let rhs = match literal {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            lhs.partial_cmp(&rhs)
        }
        TypedValue::Boolean(b) => match literal {
            Value::Bool(other) => Some(b.cmp(other)),
            Value::String(s) => s.parse::<bool>().ok().map(|other| b.cmp(&other)),
            _ => None,
        },
        TypedValue::DateTime(dt) => {
            let rhs = match literal {
                Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).ok()?.timestamp_millis(),
                Value::Number(n) => n.as_i64()?,
                _ => return None,
            };
            Some(dt.timestamp_millis().cmp(&rhs))
        }
        TypedValue::String(s) => match literal {
            Value::String(other) => Some(s.as_str().cmp(other.as_str())),
            Value::Null => None,
            other => Some(s.as_str().cmp(other.to_string().as_str())),
        },
        TypedValue::Json(v) => (v == literal).then_some(Ordering::Equal),
    }
}

/// Unset values sort after set ones in either direction
fn compare_optional(a: Option<&TypedValue>, b: Option<&TypedValue>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if ascending => compare_cells(a, b),
        (Some(a), Some(b)) => compare_cells(a, b).reverse(),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total order over cells: values of different kinds order by kind, numbers
/// by `f64::total_cmp`
fn compare_cells(a: &TypedValue, b: &TypedValue) -> Ordering {
    match (a, b) {
        (TypedValue::String(x), TypedValue::String(y)) => x.cmp(y),
        (TypedValue::Boolean(x), TypedValue::Boolean(y)) => x.cmp(y),
        (TypedValue::DateTime(x), TypedValue::DateTime(y)) => x.cmp(y),
        (TypedValue::Json(_), TypedValue::Json(_)) => display_value(a).cmp(&display_value(b)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => kind_rank(a).cmp(&kind_rank(b)),
        },
    }
}

fn kind_rank(value: &TypedValue) -> u8 {
    match value {
        TypedValue::Boolean(_) => 0,
        TypedValue::Integer(_) | TypedValue::Number(_) => 1,
        TypedValue::DateTime(_) => 2,
        TypedValue::String(_) => 3,
        TypedValue::Json(_) => 4,
    }
}
