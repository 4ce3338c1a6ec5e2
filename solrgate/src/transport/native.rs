//! Solr's native request and response shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Per-document, per-field highlighted fragments, keyed by document id
pub type HighlightOverlay = HashMap<String, HashMap<String, Vec<String>>>;

/// A raw Solr document
pub type SolrDocument = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightParams {
    pub fields: String,
    /// 0 disables fragmenting, so whole field values are highlighted
    pub fragment_size: u32,
    pub simple_pre: String,
    pub simple_post: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreLikeThisParams {
    /// `mlt.fl`: fields similarity is computed from
    pub fields: String,
    /// `mlt.qf`: fields (with optional boosts) similarity is restricted to
    pub query_fields: String,
}

/// Native query descriptor, rendered to `/select` parameters by
/// [`SolrQuery::to_params`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolrQuery {
    pub q: Option<String>,
    pub start: Option<i64>,
    pub rows: Option<i64>,
    pub sort: Vec<SortDirective>,
    pub filter_queries: Vec<String>,
    pub highlight: Option<HighlightParams>,
    pub more_like_this: Option<MoreLikeThisParams>,
    pub include_score: bool,
    pub default_field: Option<String>,
}

impl SolrQuery {
    pub fn add_sort(&mut self, field: impl Into<String>, order: SortOrder) {
        self.sort.push(SortDirective {
            field: field.into(),
            order,
        });
    }

    pub fn add_filter_query(&mut self, fq: impl Into<String>) {
        self.filter_queries.push(fq.into());
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| params.push((k.to_string(), v));

        if let Some(q) = &self.q {
            push("q", q.clone());
        }
        if let Some(df) = &self.default_field {
            push("df", df.clone());
        }
        if let Some(start) = self.start {
            push("start", start.to_string());
        }
        if let Some(rows) = self.rows {
            push("rows", rows.to_string());
        }
        if !self.sort.is_empty() {
            let sort = self
                .sort
                .iter()
                .map(|s| format!("{} {}", s.field, s.order.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            push("sort", sort);
        }
        for fq in &self.filter_queries {
            push("fq", fq.clone());
        }
        if self.include_score {
            push("fl", "*,score".to_string());
        }
        if let Some(hl) = &self.highlight {
            push("hl", "true".to_string());
            push("hl.fl", hl.fields.clone());
            push("hl.fragsize", hl.fragment_size.to_string());
            push("hl.simple.pre", hl.simple_pre.clone());
            push("hl.simple.post", hl.simple_post.clone());
        }
        if let Some(mlt) = &self.more_like_this {
            push("mlt", "true".to_string());
            push("mlt.fl", mlt.fields.clone());
            push("mlt.qf", mlt.query_fields.clone());
        }
        push("wt", "json".to_string());

        params
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub status: i64,
    #[serde(rename = "QTime", default)]
    pub qtime: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocumentList {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<SolrDocument>,
}

/// `/select` response body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SolrResponse {
    #[serde(rename = "responseHeader", default)]
    pub header: Option<ResponseHeader>,
    #[serde(default)]
    pub response: Option<DocumentList>,
    #[serde(default)]
    pub highlighting: Option<HighlightOverlay>,
}

impl SolrResponse {
    pub fn num_found(&self) -> u64 {
        self.response.as_ref().map_or(0, |r| r.num_found)
    }

    pub fn docs(&self) -> &[SolrDocument] {
        self.response
            .as_ref()
            .map(|r| r.docs.as_slice())
            .unwrap_or(&[])
    }
}

/// One entry of the `/schema/fields` catalogue. `indexed` and `stored` are
/// informational only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogueField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub indexed: Option<bool>,
    #[serde(default)]
    pub stored: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaFieldsResponse {
    #[serde(default)]
    pub fields: Vec<CatalogueField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub msg: Option<String>,
}
