//! Maps Solr documents onto a caller schema

use serde_json::Value;

use crate::config::CoercionPolicy;
use crate::schema::{coerce, Schema};
use crate::table::{Row, Table};
use crate::transport::{HighlightOverlay, SolrDocument};
use crate::{Error, Result};

/// Document field whose value keys the highlighting overlay
pub const ID_FIELD: &str = "id";

pub struct ResultMapper {
    policy: CoercionPolicy,
}

impl ResultMapper {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }

    /// Build a table from `docs` in engine order.
    ///
    /// At most `max_rows` documents are mapped when a cap is given. Columns
    /// come from `schema` only; fields missing from a document stay unset.
    pub fn map(
        &self,
        schema: &Schema,
        docs: &[SolrDocument],
        max_rows: Option<usize>,
        overlay: Option<&HighlightOverlay>,
    ) -> Result<Table> {
        let mut table = Table::new(schema.clone());
        let limit = max_rows.map_or(docs.len(), |cap| cap.min(docs.len()));

        for doc in &docs[..limit] {
            let highlights = overlay.and_then(|o| document_id(doc).and_then(|id| o.get(&id)));
            let mut row = Row::new();

            for field in schema.fields() {
                let fragments = highlights
                    .and_then(|h| h.get(&field.name))
                    .map(|f| Value::from(f.clone()));
                let Some(raw) = fragments.as_ref().or_else(|| doc.get(&field.name)) else {
                    continue;
                };

                match coerce(raw, field.base_type) {
                    Ok(Some(value)) => row.set(field.name.clone(), value),
                    Ok(None) => {}
                    Err(reason) => match self.policy {
                        CoercionPolicy::Lenient => {
                            tracing::warn!(
                                field = %field.name,
                                base_type = %field.base_type,
                                %reason,
                                "Skipping field that cannot be coerced"
                            );
                        }
                        CoercionPolicy::Strict => {
                            return Err(Error::Coercion {
                                field: field.name.clone(),
                                base_type: field.base_type,
                                reason,
                            });
                        }
                    },
                }
            }

            table.push_row(row);
        }

        Ok(table)
    }
}

impl Default for ResultMapper {
    fn default() -> Self {
        Self::new(CoercionPolicy::default())
    }
}

fn document_id(doc: &SolrDocument) -> Option<String> {
    match doc.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
