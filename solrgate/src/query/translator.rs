//! Abstract request to native Solr query translation

use super::fuzzy::build_fuzzy_query;
use super::types::{SearchRequest, SortExpression};
use crate::transport::{HighlightParams, MoreLikeThisParams, SolrQuery, SortOrder};
use crate::Result;

pub const HIGHLIGHT_PRE: &str = "<span style=\"background-color: #FFFF00\">";
pub const HIGHLIGHT_POST: &str = "</span>";

/// Translates [`SearchRequest`]s into [`SolrQuery`] descriptors
pub struct QueryTranslator;

impl QueryTranslator {
    /// Build the native query. Fails only on invalid fuzzy parameters, before
    /// anything is sent.
    pub fn translate(request: &SearchRequest) -> Result<SolrQuery> {
        let mut query = SolrQuery::default();

        match &request.fuzzy {
            Some(spec) => {
                query.q = Some(build_fuzzy_query(spec)?);
                query.default_field = Some(spec.default_field.clone()).filter(|f| !f.is_empty());
            }
            None => query.q = request.query.clone(),
        }

        Self::translate_sort(&request.sort, &mut query);

        if let Some(fq) = &request.raw_filter {
            query.add_filter_query(fq.clone());
        }

        if let Some(window) = request.window {
            query.start = Some(window.start);
            query.rows = Some(window.rows);
        }

        if request.highlight {
            query.highlight = Some(HighlightParams {
                fields: "*".to_string(),
                fragment_size: 0,
                simple_pre: HIGHLIGHT_PRE.to_string(),
                simple_post: HIGHLIGHT_POST.to_string(),
            });
        }

        if let Some(similarity) = &request.similarity {
            query.include_score = true;
            query.more_like_this = Some(MoreLikeThisParams {
                fields: similarity.fields.clone(),
                query_fields: similarity.fields.clone(),
            });
        }

        Ok(query)
    }

    pub fn translate_sort(sort: &SortExpression, query: &mut SolrQuery) {
        for clause in sort.clauses() {
            let order = if clause.ascending {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            };
            query.add_sort(clause.field_name.clone(), order);
        }
    }
}
