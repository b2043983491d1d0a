//! Template catalog: JSON-backed store of meme templates and their embeddings.

use std::path::Path;

use crate::types::{MemeError, MemeResult, TemplateRecord};

/// An in-memory catalog of meme templates, loaded once at startup.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    records: Vec<TemplateRecord>,
}

impl TemplateCatalog {
    /// Load a catalog from a JSON file containing an array of template records.
    pub fn load(path: &Path) -> MemeResult<TemplateCatalog> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<TemplateRecord> = serde_json::from_str(&raw).map_err(|e| {
            MemeError::Catalog(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Self::from_records(records)
    }

    /// Build a catalog from records already in memory, validating that every
    /// embedding has the same non-zero dimension.
    pub fn from_records(records: Vec<TemplateRecord>) -> MemeResult<TemplateCatalog> {
        if let Some(first) = records.first() {
            let dim = first.embedding.len();
            if dim == 0 {
                return Err(MemeError::Catalog(format!(
                    "Template '{}' has an empty embedding",
                    first.id
                )));
            }
            for record in &records {
                if record.embedding.len() != dim {
                    return Err(MemeError::Catalog(format!(
                        "Template '{}' has embedding dimension {}, expected {}",
                        record.id,
                        record.embedding.len(),
                        dim
                    )));
                }
            }
        }
        Ok(TemplateCatalog { records })
    }

    pub fn records(&self) -> &[TemplateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension shared by every record, or `None` when empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.records.first().map(|r| r.embedding.len())
    }
}
