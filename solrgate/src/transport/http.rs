//! reqwest-backed Solr transport

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use tokio::sync::OnceCell;
use url::Url;

use super::native::{
    CatalogueField, ErrorResponse, SchemaFieldsResponse, SolrDocument, SolrQuery, SolrResponse,
};
use super::SolrTransport;
use crate::config::ConnectionConfig;
use crate::{Error, Result};

/// HTTP transport. The client is built on first use and shared by every
/// later call.
pub struct HttpTransport {
    settings: ConnectionConfig,
    client: OnceCell<Client>,
}

impl HttpTransport {
    pub fn new(settings: ConnectionConfig) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &ConnectionConfig {
        &self.settings
    }

    async fn client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async {
                let timeout = self.settings.effective_timeout();
                tracing::debug!(
                    server = %self.settings.server_name,
                    port = self.settings.server_port,
                    ssl = self.settings.use_ssl,
                    timeout_ms = timeout.as_millis() as u64,
                    "Building Solr HTTP client"
                );
                Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(Error::from)
            })
            .await
    }

    fn endpoint(&self, core: &str, path: &str) -> Result<Url> {
        Ok(self.settings.base_url(Some(core))?.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.settings.has_credentials() {
            request.basic_auth(&self.settings.username, Some(&self.settings.password))
        } else {
            request
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await.map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.msg)
                .unwrap_or(body);
            return Err(Error::Engine {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    fn map_err(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.settings.effective_timeout().as_millis() as u64)
        } else {
            Error::Http(err)
        }
    }
}

#[async_trait]
impl SolrTransport for HttpTransport {
    async fn query(&self, core: &str, query: &SolrQuery) -> Result<SolrResponse> {
        let url = self.endpoint(core, "select")?;
        let request = self.client().await?.post(url).form(&query.to_params());
        let response = self.send(request).await?;
        response.json().await.map_err(|e| self.map_err(e))
    }

    async fn add_documents(&self, core: &str, documents: &[SolrDocument]) -> Result<()> {
        let url = self.endpoint(core, "update")?;
        let request = self
            .client()
            .await?
            .post(url)
            .query(&[("wt", "json")])
            .json(documents);
        self.send(request).await?;
        Ok(())
    }

    async fn commit(&self, core: &str) -> Result<()> {
        let url = self.endpoint(core, "update")?;
        let request = self
            .client()
            .await?
            .post(url)
            .query(&[("wt", "json")])
            .json(&json!({ "commit": {} }));
        self.send(request).await?;
        Ok(())
    }

    async fn schema_fields(&self, core: &str) -> Result<Vec<CatalogueField>> {
        let url = self.endpoint(core, "schema/fields")?;
        let request = self
            .client()
            .await?
            .get(url)
            .query(&[("showDefaults", "true"), ("wt", "json")]);
        let response = self.send(request).await?;
        let catalogue: SchemaFieldsResponse = response.json().await.map_err(|e| self.map_err(e))?;
        Ok(catalogue.fields)
    }
}
