//! Query executors
//!
//! Every search variant runs through the same flow: resolve the schema,
//! translate the request, make one transport round trip under the
//! connection timeout, then map (or count) the response. Variants differ
//! only in their [`ExecutionPlan`].

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, ConnectorConfig, QueryFailurePolicy};
use crate::mapper::ResultMapper;
use crate::query::{
    FuzzyQuerySpec, PagingWindow, QueryTranslator, SearchRequest, Similarity, SortExpression,
    TableQuery,
};
use crate::schema::{Schema, SchemaProvider};
use crate::sync::SchemaSynchronizer;
use crate::table::Table;
use crate::telemetry::{log_query_error, log_query_success, QueryTelemetry};
use crate::transport::{HttpTransport, SolrQuery, SolrResponse, SolrTransport};
use crate::{Error, Result};

/// Rows requested and mapped by boosted and fuzzy searches
pub const FIXED_ROW_LIMIT: usize = 500;

/// Row cap of a plain search when the caller gives none
pub const DEFAULT_MAX_ROWS: usize = 500;

/// How one search variant shapes the shared flow
#[derive(Debug, Clone, Copy)]
struct ExecutionPlan {
    operation: &'static str,
    window: PagingWindow,
    row_cap: Option<usize>,
    highlight: bool,
}

impl ExecutionPlan {
    fn capped(operation: &'static str, cap: usize) -> Self {
        Self {
            operation,
            window: PagingWindow::count(0, cap as i64),
            row_cap: Some(cap),
            highlight: false,
        }
    }

    fn paged(operation: &'static str, start: i64, stop: i64, highlight: bool) -> Self {
        Self {
            operation,
            window: PagingWindow::range(start, stop),
            row_cap: None,
            highlight,
        }
    }
}

/// Entry point for searching, indexing and schema sync against one Solr
/// deployment
pub struct SolrConnector {
    transport: Arc<dyn SolrTransport>,
    schemas: Arc<dyn SchemaProvider>,
    mapper: ResultMapper,
    settings: ConnectorConfig,
    timeout: Duration,
}

impl SolrConnector {
    pub fn new(
        transport: Arc<dyn SolrTransport>,
        schemas: Arc<dyn SchemaProvider>,
        settings: ConnectorConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            schemas,
            mapper: ResultMapper::new(settings.coercion),
            settings,
            timeout,
        }
    }

    /// Connector over HTTP using the connection section of `config`
    pub fn from_config(config: &Config, schemas: Arc<dyn SchemaProvider>) -> Self {
        let timeout = config.connection.effective_timeout();
        let transport = Arc::new(HttpTransport::new(config.connection.clone()));
        Self::new(transport, schemas, config.connector, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of documents matching `query`. No documents are fetched.
    pub async fn count_matches(
        &self,
        core: &str,
        query: Option<&str>,
        sort: Option<&SortExpression>,
        raw_filter: Option<&str>,
        schema_id: &str,
    ) -> Result<u64> {
        self.resolve_schema(schema_id)?;
        let mut request = SearchRequest::new(query)
            .with_sort(sort)
            .with_raw_filter(raw_filter);
        request.window = Some(PagingWindow::count(0, 0));
        let native = QueryTranslator::translate(&request)?;

        let mut telemetry = QueryTelemetry::new();
        match self.run_query(core, &native, &mut telemetry).await {
            Ok(response) => {
                let num_found = response.num_found();
                log_query_success(&telemetry.finish(core, "count", num_found, 0));
                Ok(num_found)
            }
            Err(err) => self.recover(core, "count", err).map(|()| 0),
        }
    }

    /// Search returning at most 500 rows, optionally expanded with
    /// similarity over `boost_fields` (e.g. `title^2 subject`)
    #[allow(clippy::too_many_arguments)]
    pub async fn boosted_search(
        &self,
        core: &str,
        query: Option<&str>,
        sort: Option<&SortExpression>,
        raw_filter: Option<&str>,
        schema_id: &str,
        enable_similarity: bool,
        boost_fields: &str,
    ) -> Result<Table> {
        let mut request = SearchRequest::new(query)
            .with_sort(sort)
            .with_raw_filter(raw_filter);
        if enable_similarity {
            request.similarity = Some(Similarity {
                fields: boost_fields.to_string(),
            });
        }
        self.execute(
            core,
            schema_id,
            request,
            ExecutionPlan::capped("boosted", FIXED_ROW_LIMIT),
        )
        .await
    }

    /// Search capped at `max_rows` (500 when unset). `post_filter` filters
    /// and sorts the mapped rows and is never sent to the engine.
    pub async fn search(
        &self,
        core: &str,
        query: Option<&str>,
        sort: Option<&SortExpression>,
        post_filter: Option<&TableQuery>,
        schema_id: &str,
        max_rows: Option<usize>,
    ) -> Result<Table> {
        let request = SearchRequest::new(query).with_sort(sort);
        let cap = max_rows.unwrap_or(DEFAULT_MAX_ROWS);
        let mut table = self
            .execute(core, schema_id, request, ExecutionPlan::capped("search", cap))
            .await?;

        if let Some(post_filter) = post_filter {
            let before = table.len();
            post_filter.apply(&mut table)?;
            tracing::debug!(core = %core, before, after = table.len(), "Applied post-fetch filter");
        }

        Ok(table)
    }

    /// Rows `[start, stop)` of the result set, uncapped
    #[allow(clippy::too_many_arguments)]
    pub async fn paged_search(
        &self,
        core: &str,
        query: Option<&str>,
        sort: Option<&SortExpression>,
        raw_filter: Option<&str>,
        schema_id: &str,
        start: i64,
        stop: i64,
    ) -> Result<Table> {
        let request = SearchRequest::new(query)
            .with_sort(sort)
            .with_raw_filter(raw_filter);
        self.execute(
            core,
            schema_id,
            request,
            ExecutionPlan::paged("paged", start, stop, false),
        )
        .await
    }

    /// Like [`paged_search`](Self::paged_search), with highlighted fragments
    /// substituted for stored values
    #[allow(clippy::too_many_arguments)]
    pub async fn paged_highlighted_search(
        &self,
        core: &str,
        query: Option<&str>,
        sort: Option<&SortExpression>,
        raw_filter: Option<&str>,
        schema_id: &str,
        start: i64,
        stop: i64,
    ) -> Result<Table> {
        let request = SearchRequest::new(query)
            .with_sort(sort)
            .with_raw_filter(raw_filter);
        self.execute(
            core,
            schema_id,
            request,
            ExecutionPlan::paged("highlight", start, stop, true),
        )
        .await
    }

    /// Fuzzy term search returning at most 500 rows
    pub async fn fuzzy_search(
        &self,
        core: &str,
        schema_id: &str,
        spec: &FuzzyQuerySpec,
    ) -> Result<Table> {
        spec.validate()?;
        self.execute(
            core,
            schema_id,
            SearchRequest::fuzzy(spec.clone()),
            ExecutionPlan::capped("fuzzy", FIXED_ROW_LIMIT),
        )
        .await
    }

    /// Add one document and commit
    pub async fn index_document(&self, core: &str, fields: &Map<String, Value>) -> Result<()> {
        self.with_timeout(self.transport.add_documents(core, std::slice::from_ref(fields)))
            .await?;
        self.with_timeout(self.transport.commit(core)).await?;
        tracing::info!(core = %core, documents = 1, "Indexed documents");
        Ok(())
    }

    /// Add every row of `rows` and commit. An empty table only commits.
    pub async fn index_documents(&self, core: &str, rows: &Table) -> Result<()> {
        let documents = rows.to_documents();
        if !documents.is_empty() {
            self.with_timeout(self.transport.add_documents(core, &documents))
                .await?;
        }
        self.with_timeout(self.transport.commit(core)).await?;
        tracing::info!(core = %core, documents = documents.len(), "Indexed documents");
        Ok(())
    }

    /// Merge the core's field catalogue into `schema_id`, store the result
    /// and return an empty table over it
    pub async fn sync_schema(&self, core: &str, schema_id: &str) -> Result<Table> {
        let mut schema = self.resolve_schema(schema_id)?;
        let catalogue = self
            .with_timeout(self.transport.schema_fields(core))
            .await?;

        let added = SchemaSynchronizer::merge(&mut schema, &catalogue);
        self.schemas.store(schema_id, schema.clone())?;
        tracing::info!(
            core = %core,
            schema = %schema_id,
            catalogue = catalogue.len(),
            added,
            "Synchronized schema"
        );

        Ok(Table::new(schema))
    }

    async fn execute(
        &self,
        core: &str,
        schema_id: &str,
        mut request: SearchRequest,
        plan: ExecutionPlan,
    ) -> Result<Table> {
        let schema = self.resolve_schema(schema_id)?;
        request.window = Some(plan.window);
        request.highlight = plan.highlight;
        let native = QueryTranslator::translate(&request)?;

        let mut telemetry = QueryTelemetry::new();
        let response = match self.run_query(core, &native, &mut telemetry).await {
            Ok(response) => response,
            Err(err) => {
                return self
                    .recover(core, plan.operation, err)
                    .map(|()| Table::new(schema));
            }
        };

        let overlay = if plan.highlight {
            response.highlighting.as_ref()
        } else {
            None
        };
        let table = self
            .mapper
            .map(&schema, response.docs(), plan.row_cap, overlay)?;

        log_query_success(&telemetry.finish(
            core,
            plan.operation,
            response.num_found(),
            table.len(),
        ));
        Ok(table)
    }

    fn resolve_schema(&self, schema_id: &str) -> Result<Schema> {
        if schema_id.trim().is_empty() {
            return Err(Error::MissingSchema);
        }
        self.schemas.lookup(schema_id)
    }

    async fn run_query(
        &self,
        core: &str,
        query: &SolrQuery,
        telemetry: &mut QueryTelemetry,
    ) -> Result<SolrResponse> {
        tracing::debug!(core = %core, q = ?query.q, start = ?query.start, rows = ?query.rows, "Sending query");
        let sent = Instant::now();
        let response = self.with_timeout(self.transport.query(core, query)).await;
        telemetry.mark_engine(sent);
        response
    }

    /// Apply the query failure policy to `err`
    fn recover(&self, core: &str, operation: &str, err: Error) -> Result<()> {
        log_query_error(core, operation, &err.to_string());
        match self.settings.on_query_failure {
            QueryFailurePolicy::Recover if err.is_query_failure() => Ok(()),
            _ => Err(err),
        }
    }

    async fn with_timeout<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_millis() as u64))?
    }
}
