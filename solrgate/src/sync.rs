//! Merges Solr's live field catalogue into caller schemas

use crate::schema::{base_type_for_solr_type, FieldDefinition, Schema};
use crate::transport::CatalogueField;

/// Description attached to fields discovered from the engine
pub const DISCOVERED_FIELD_DESCRIPTION: &str = "solr-schema";

pub struct SchemaSynchronizer;

impl SchemaSynchronizer {
    /// Add every catalogue field the schema does not know yet and return how
    /// many were added. Known fields keep their caller-chosen types.
    pub fn merge(schema: &mut Schema, catalogue: &[CatalogueField]) -> usize {
        let mut added = 0;
        for entry in catalogue {
            if schema.has_field(&entry.name) {
                continue;
            }
            let base_type = base_type_for_solr_type(&entry.field_type);
            tracing::debug!(
                field = %entry.name,
                solr_type = %entry.field_type,
                %base_type,
                indexed = ?entry.indexed,
                stored = ?entry.stored,
                "Adding discovered field"
            );
            schema.add_field(
                FieldDefinition::new(entry.name.clone(), base_type)
                    .with_description(DISCOVERED_FIELD_DESCRIPTION),
            );
            added += 1;
        }
        added
    }
}
