pub mod http;
pub mod native;

pub use http::HttpTransport;
pub use native::{
    CatalogueField, DocumentList, HighlightOverlay, HighlightParams, MoreLikeThisParams,
    SolrDocument, SolrQuery, SolrResponse, SortDirective, SortOrder,
};

use async_trait::async_trait;

use crate::Result;

/// Network boundary to a Solr deployment, addressed per core
#[async_trait]
pub trait SolrTransport: Send + Sync {
    /// Run a `/select` query
    async fn query(&self, core: &str, query: &SolrQuery) -> Result<SolrResponse>;

    /// Submit documents for indexing (not committed)
    async fn add_documents(&self, core: &str, documents: &[SolrDocument]) -> Result<()>;

    /// Commit pending updates
    async fn commit(&self, core: &str) -> Result<()>;

    /// Fetch the core's `/schema/fields` catalogue
    async fn schema_fields(&self, core: &str) -> Result<Vec<CatalogueField>>;
}
