use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Schema;
use crate::{Error, Result};

/// Lookup and write-back of named caller schemas
pub trait SchemaProvider: Send + Sync {
    /// Find a schema by identifier.
    fn lookup(&self, schema_id: &str) -> Result<Schema>;

    /// Replace the stored definition of `schema_id` with `schema`.
    fn store(&self, schema_id: &str, schema: Schema) -> Result<()>;
}

/// In-memory schema registry
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemas(schemas: HashMap<String, Schema>) -> Self {
        Self {
            schemas: RwLock::new(schemas),
        }
    }

    pub fn insert(&self, schema: Schema) {
        self.schemas.write().insert(schema.name.clone(), schema);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl SchemaProvider for SchemaRegistry {
    fn lookup(&self, schema_id: &str) -> Result<Schema> {
        self.schemas
            .read()
            .get(schema_id)
            .cloned()
            .ok_or_else(|| Error::SchemaNotFound(schema_id.to_string()))
    }

    fn store(&self, schema_id: &str, schema: Schema) -> Result<()> {
        self.schemas.write().insert(schema_id.to_string(), schema);
        Ok(())
    }
}

/// Reads schema definitions from `*.yaml` files in a directory
pub struct SchemaLoader {
    schemas_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(schemas_dir: impl AsRef<Path>) -> Self {
        Self {
            schemas_dir: schemas_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load_all(&self) -> Result<HashMap<String, Schema>> {
        let mut schemas = HashMap::new();

        if !self.schemas_dir.exists() {
            return Err(Error::Config(format!(
                "Schemas directory does not exist: {}",
                self.schemas_dir.display()
            )));
        }

        for entry in fs::read_dir(&self.schemas_dir)? {
            let path = entry?.path();

            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }

            let schema = Self::load_schema(&path)?;
            schemas.insert(schema.name.clone(), schema);
        }

        Ok(schemas)
    }

    pub fn load_schema(path: &Path) -> Result<Schema> {
        let content = fs::read_to_string(path)?;
        // Re-run through with_fields so duplicate names collapse to the first
        let raw: Schema = serde_yaml::from_str(&content)?;
        Ok(Schema::with_fields(raw.name.clone(), raw.fields().to_vec()))
    }

    /// Write `schema` back to the file that defines it, or to `<name>.yaml`
    /// when no file does yet
    pub fn save_schema(&self, schema: &Schema) -> Result<PathBuf> {
        fs::create_dir_all(&self.schemas_dir)?;
        let path = match self.find_schema_file(&schema.name)? {
            Some(path) => path,
            None => self.schemas_dir.join(format!("{}.yaml", schema.name)),
        };
        fs::write(&path, serde_yaml::to_string(schema)?)?;
        Ok(path)
    }

    /// Schemas are keyed by their `name` field, not the file stem
    fn find_schema_file(&self, name: &str) -> Result<Option<PathBuf>> {
        for entry in fs::read_dir(&self.schemas_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if Self::load_schema(&path).is_ok_and(|s| s.name == name) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Load every schema into a registry
    pub fn into_registry(self) -> Result<SchemaRegistry> {
        Ok(SchemaRegistry::with_schemas(self.load_all()?))
    }
}
