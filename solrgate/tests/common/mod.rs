//! In-memory Solr transport that records every call

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use solrgate::config::{ConnectorConfig, QueryFailurePolicy};
use solrgate::schema::{BaseType, FieldDefinition, Schema, SchemaRegistry};
use solrgate::transport::{CatalogueField, SolrDocument, SolrQuery, SolrResponse, SolrTransport};
use solrgate::{Error, Result, SolrConnector};

/// One recorded transport call
#[derive(Debug, Clone)]
pub enum Call {
    Query { core: String, params: Vec<(String, String)> },
    Add { core: String, documents: Vec<SolrDocument> },
    Commit { core: String },
    SchemaFields { core: String },
}

#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<Call>>,
    response: Mutex<Value>,
    catalogue: Mutex<Vec<CatalogueField>>,
    fail_with: Mutex<Option<(u16, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        let transport = Self::default();
        *transport.response.lock() = json!({"response": {"numFound": 0, "start": 0, "docs": []}});
        Arc::new(transport)
    }

    pub fn respond_with(&self, body: Value) {
        *self.response.lock() = body;
    }

    pub fn with_catalogue(&self, fields: &[(&str, &str)]) {
        *self.catalogue.lock() = fields
            .iter()
            .map(|(name, field_type)| CatalogueField {
                name: name.to_string(),
                field_type: field_type.to_string(),
                indexed: Some(true),
                stored: Some(true),
            })
            .collect();
    }

    pub fn fail(&self, status: u16, message: &str) {
        *self.fail_with.lock() = Some((status, message.to_string()));
    }

    pub fn stall(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Parameters of the only recorded query
    pub fn query_params(&self) -> Vec<(String, String)> {
        let queries: Vec<_> = self
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Query { params, .. } => Some(params),
                _ => None,
            })
            .collect();
        assert_eq!(queries.len(), 1, "expected exactly one query");
        queries.into_iter().next().unwrap()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self) -> Result<()> {
        match self.fail_with.lock().clone() {
            Some((status, message)) => Err(Error::Engine { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SolrTransport for RecordingTransport {
    async fn query(&self, core: &str, query: &SolrQuery) -> Result<SolrResponse> {
        self.calls.lock().push(Call::Query {
            core: core.to_string(),
            params: query.to_params(),
        });
        self.pause().await;
        self.check()?;
        let body = self.response.lock().clone();
        Ok(serde_json::from_value(body)?)
    }

    async fn add_documents(&self, core: &str, documents: &[SolrDocument]) -> Result<()> {
        self.calls.lock().push(Call::Add {
            core: core.to_string(),
            documents: documents.to_vec(),
        });
        self.pause().await;
        self.check()
    }

    async fn commit(&self, core: &str) -> Result<()> {
        self.calls.lock().push(Call::Commit {
            core: core.to_string(),
        });
        self.check()
    }

    async fn schema_fields(&self, core: &str) -> Result<Vec<CatalogueField>> {
        self.calls.lock().push(Call::SchemaFields {
            core: core.to_string(),
        });
        self.pause().await;
        self.check()?;
        Ok(self.catalogue.lock().clone())
    }
}

pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn products_schema() -> Schema {
    Schema::with_fields(
        "products",
        vec![
            FieldDefinition::new("id", BaseType::String),
            FieldDefinition::new("title", BaseType::String),
            FieldDefinition::new("price", BaseType::Number),
            FieldDefinition::new("inStock", BaseType::Boolean),
        ],
    )
}

pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub schemas: Arc<SchemaRegistry>,
    pub connector: SolrConnector,
}

pub fn harness() -> Harness {
    harness_with(QueryFailurePolicy::Surface)
}

pub fn harness_with(on_query_failure: QueryFailurePolicy) -> Harness {
    let transport = RecordingTransport::new();
    let schemas = Arc::new(SchemaRegistry::new());
    schemas.insert(products_schema());

    let settings = ConnectorConfig {
        on_query_failure,
        ..ConnectorConfig::default()
    };
    let connector = SolrConnector::new(
        transport.clone(),
        schemas.clone(),
        settings,
        Duration::from_secs(60),
    );

    Harness {
        transport,
        schemas,
        connector,
    }
}

pub fn docs_response(docs: Value) -> Value {
    let num_found = docs.as_array().map_or(0, |d| d.len());
    json!({
        "responseHeader": {"status": 0, "QTime": 1},
        "response": {"numFound": num_found, "start": 0, "docs": docs}
    })
}
