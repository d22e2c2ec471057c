//! Persistence collaborator: CRUD over saved templates.
//!
//! The editor only needs `data` to round-trip the Document JSON schema; the
//! transport behind a [`TemplateRepository`] is up to the host. An in-memory
//! implementation is provided for tests, the CLI and the WASM demo shell.

use chrono::{DateTime, Utc};
use mb_core::Template;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("template `{0}` not found")]
    NotFound(String),
    #[error("template `{0}` already exists")]
    Duplicate(String),
    #[error("could not encode templates: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One saved template, in the shape the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, template: &Template) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            data: template.to_json(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild the document. Malformed data degrades to defaults.
    pub fn template(&self) -> Template {
        Template::from_json(&self.data)
    }
}

pub trait TemplateRepository {
    /// Store a new record under a repository-assigned id.
    fn create(&mut self, name: &str, data: Value) -> Result<TemplateRecord, RepositoryError>;

    fn get(&self, id: &str) -> Result<TemplateRecord, RepositoryError>;

    /// All records, oldest first.
    fn list(&self) -> Result<Vec<TemplateRecord>, RepositoryError>;

    /// Replace `data` (and `name` when given); bumps `updated_at`.
    fn update(&mut self, id: &str, name: Option<&str>, data: Value) -> Result<TemplateRecord, RepositoryError>;

    fn delete(&mut self, id: &str) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    records: BTreeMap<String, TemplateRecord>,
    next_id: u64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with its own id, e.g. one restored from a dump.
    pub fn insert(&mut self, record: TemplateRecord) -> Result<(), RepositoryError> {
        if self.records.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate(record.id));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dump every record as a JSON array.
    pub fn to_json_string(&self) -> Result<String, RepositoryError> {
        let records: Vec<&TemplateRecord> = self.records.values().collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, RepositoryError> {
        let records: Vec<TemplateRecord> = serde_json::from_str(text)?;
        let mut repo = Self::new();
        for record in records {
            repo.insert(record)?;
        }
        Ok(repo)
    }

    fn mint_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("tpl-{}", self.next_id);
            if !self.records.contains_key(&id) {
                return id;
            }
        }
    }
}

impl TemplateRepository for MemoryRepository {
    fn create(&mut self, name: &str, data: Value) -> Result<TemplateRecord, RepositoryError> {
        let id = self.mint_id();
        let now = Utc::now();
        let record = TemplateRecord {
            id: id.clone(),
            name: name.to_string(),
            data,
            created_at: now,
            updated_at: now,
        };
        log::debug!("created template record {id}");
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<TemplateRecord, RepositoryError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<TemplateRecord>, RepositoryError> {
        let mut records: Vec<TemplateRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn update(&mut self, id: &str, name: Option<&str>, data: Value) -> Result<TemplateRecord, RepositoryError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        if let Some(name) = name {
            record.name = name.to_string();
        }
        record.data = data;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), RepositoryError> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crud_cycle() {
        let mut repo = MemoryRepository::new();
        let created = repo.create("Welcome", json!({ "children": [] })).unwrap();
        assert_eq!(repo.get(&created.id).unwrap().name, "Welcome");

        let updated = repo
            .update(&created.id, Some("Welcome v2"), json!({ "children": [{ "name": "Section" }] }))
            .unwrap();
        assert_eq!(updated.name, "Welcome v2");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        // The stored body has no root id, so each decode mints a new one.
        let t = updated.template();
        assert_eq!(t.children_of(t.root_id()).len(), 1);

        assert_eq!(repo.list().unwrap().len(), 1);
        repo.delete(&created.id).unwrap();
        assert!(matches!(repo.get(&created.id), Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.delete(&created.id), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut repo = MemoryRepository::new();
        let record = TemplateRecord::new("a", "A", &Template::new());
        repo.insert(record.clone()).unwrap();
        assert!(matches!(repo.insert(record), Err(RepositoryError::Duplicate(_))));
    }

    #[test]
    fn record_json_uses_camel_case() {
        let record = TemplateRecord::new("a", "A", &Template::new());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn dump_and_restore() {
        let mut repo = MemoryRepository::new();
        repo.create("One", json!({})).unwrap();
        repo.create("Two", json!({})).unwrap();
        let text = repo.to_json_string().unwrap();
        let restored = MemoryRepository::from_json_str(&text).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(matches!(
            MemoryRepository::from_json_str("nope"),
            Err(RepositoryError::Encoding(_))
        ));
    }
}
