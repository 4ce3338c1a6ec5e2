//! Query construction: abstract request types, native translation, fuzzy
//! term building and post-fetch table queries

pub mod fuzzy;
pub mod table_query;
pub mod translator;
pub mod types;

pub use table_query::{Filter, TableQuery};
pub use translator::QueryTranslator;
pub use types::{
    FuzzyQuerySpec, PagingWindow, SearchRequest, Similarity, SortClause, SortExpression,
    MAX_EDIT_DISTANCE,
};
