//! Abstract, schema-agnostic query request types

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Highest edit distance Lucene's Levenshtein automata support
pub const MAX_EDIT_DISTANCE: u32 = 2;

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "isAscending", default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

impl SortClause {
    pub fn asc(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ascending: true,
        }
    }

    pub fn desc(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ascending: false,
        }
    }
}

/// Ordered sort keys: primary first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortExpression(pub Vec<SortClause>);

impl SortExpression {
    pub fn new(clauses: Vec<SortClause>) -> Self {
        Self(clauses)
    }

    /// Parse the `sorts` list out of a JSON query object such as
    /// `{"sorts": [{"fieldName": "price", "isAscending": false}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let query: super::TableQuery = serde_json::from_str(json)?;
        Ok(Self(query.sorts))
    }

    pub fn clauses(&self) -> &[SortClause] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SortClause>> for SortExpression {
    fn from(clauses: Vec<SortClause>) -> Self {
        Self(clauses)
    }
}

/// Offset plus row count sent to the engine.
///
/// Counts are signed: a reversed `[start, stop)` window is forwarded as a
/// negative row count and rejected by the engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingWindow {
    pub start: i64,
    pub rows: i64,
}

impl PagingWindow {
    pub fn count(start: i64, rows: i64) -> Self {
        Self { start, rows }
    }

    /// Half-open `[start, stop)` window
    pub fn range(start: i64, stop: i64) -> Self {
        Self {
            start,
            rows: stop.saturating_sub(start),
        }
    }
}

/// Fuzzy term match parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyQuerySpec {
    pub field: String,
    /// Field the engine treats as default; omitted from the rendered clause
    /// when it equals `field`
    pub default_field: String,
    pub term: String,
    /// Length of the common, non-fuzzy prefix
    pub prefix_length: u32,
    pub max_edits: u32,
    /// Maximum number of terms the fuzzy clause may expand to
    pub max_expansions: u32,
    /// Count a transposition as a single edit
    pub transpositions: bool,
}

impl FuzzyQuerySpec {
    /// Build a spec from string-typed numeric parameters, as received from
    /// command lines and form inputs.
    pub fn parse(
        field: &str,
        default_field: &str,
        term: &str,
        prefix_length: &str,
        max_edits: &str,
        max_expansions: &str,
        transpositions: bool,
    ) -> Result<Self> {
        let spec = Self {
            field: field.to_string(),
            default_field: default_field.to_string(),
            term: term.to_string(),
            prefix_length: parse_param("prefixLength", prefix_length)?,
            max_edits: parse_param("maxEdits", max_edits)?,
            max_expansions: parse_param("maxExpansions", max_expansions)?,
            transpositions,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(Error::InvalidInput("fuzzy field must not be empty".into()));
        }
        if self.max_edits > MAX_EDIT_DISTANCE {
            return Err(Error::InvalidInput(format!(
                "maxEdits must be between 0 and {}, got {}",
                MAX_EDIT_DISTANCE, self.max_edits
            )));
        }
        if self.max_expansions == 0 {
            return Err(Error::InvalidInput("maxExpansions must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_param(name: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        Error::InvalidInput(format!("{} must be a non-negative integer, got '{}'", name, raw))
    })
}

/// Similarity ("more like this") expansion settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Similarity {
    /// Fields used both to compute similarity and to boost it
    pub fields: String,
}

/// Everything the translator needs to build a native query
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub sort: SortExpression,
    pub raw_filter: Option<String>,
    pub window: Option<PagingWindow>,
    pub highlight: bool,
    pub similarity: Option<Similarity>,
    pub fuzzy: Option<FuzzyQuerySpec>,
}

impl SearchRequest {
    pub fn new(query: Option<&str>) -> Self {
        Self {
            query: query.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn fuzzy(spec: FuzzyQuerySpec) -> Self {
        Self {
            fuzzy: Some(spec),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: Option<&SortExpression>) -> Self {
        self.sort = sort.cloned().unwrap_or_default();
        self
    }

    pub fn with_raw_filter(mut self, raw_filter: Option<&str>) -> Self {
        self.raw_filter = raw_filter.map(str::to_string);
        self
    }
}
