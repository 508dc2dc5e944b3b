//! In-memory store used by tests and local development.
//!
//! Mirrors the per-request handle discipline of the Sheets store against
//! process-local rows: the factory owns the shelf, each handle works on
//! one `(doc_id, sheet_name)` pair and must `load` before operating.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    matches_filter, Document, SheetStore, StoreError, StoreFactory, StoreResult, DEFAULT_SHEET,
};
use crate::query::Filter;

type Shelf = HashMap<(String, String), Vec<Document>>;

/// Factory over a process-local shelf of sheets.
#[derive(Clone, Default)]
pub struct MemoryStoreFactory {
    sheets: Arc<RwLock<Shelf>>,
    load_failure: Arc<RwLock<Option<(u16, Value)>>>,
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet with rows, creating it if absent.
    pub fn seed(&self, doc_id: &str, sheet_name: &str, rows: Vec<Document>) -> StoreResult<()> {
        let mut shelf = self
            .sheets
            .write()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        shelf.insert((doc_id.to_string(), sheet_name.to_string()), rows);
        Ok(())
    }

    /// Arrange for every subsequent `load` to fail with the given
    /// transport error. Used to exercise error pass-through.
    pub fn fail_loads_with(&self, status: u16, body: Value) -> StoreResult<()> {
        let mut failure = self
            .load_failure
            .write()
            .map_err(|_| StoreError::internal("failure slot lock poisoned"))?;
        *failure = Some((status, body));
        Ok(())
    }
}

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    type Store = MemorySheetStore;

    async fn open(&self, doc_id: &str, sheet_name: Option<&str>) -> StoreResult<MemorySheetStore> {
        let failure = self
            .load_failure
            .read()
            .map_err(|_| StoreError::internal("failure slot lock poisoned"))?
            .clone();
        Ok(MemorySheetStore {
            sheets: Arc::clone(&self.sheets),
            key: (
                doc_id.to_string(),
                sheet_name.unwrap_or(DEFAULT_SHEET).to_string(),
            ),
            failure,
            loaded: false,
        })
    }
}

/// Handle on one in-memory sheet.
pub struct MemorySheetStore {
    sheets: Arc<RwLock<Shelf>>,
    key: (String, String),
    failure: Option<(u16, Value)>,
    loaded: bool,
}

impl MemorySheetStore {
    fn ensure_loaded(&self) -> StoreResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(StoreError::internal("store used before load"))
        }
    }

    fn read_rows(&self) -> StoreResult<Vec<Document>> {
        let shelf = self
            .sheets
            .read()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        Ok(shelf.get(&self.key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn load(&mut self) -> StoreResult<()> {
        if let Some((status, body)) = &self.failure {
            return Err(StoreError::transport(*status, body.clone()));
        }
        let shelf = self
            .sheets
            .read()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        if !shelf.contains_key(&self.key) {
            return Err(StoreError::transport(
                404,
                json!({
                    "code": 404,
                    "message": format!("Requested entity was not found: {}", self.key.0),
                    "status": "NOT_FOUND",
                }),
            ));
        }
        self.loaded = true;
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.ensure_loaded()?;
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|row| matches_filter(row, filter))
            .collect())
    }

    async fn insert(&mut self, docs: Vec<Document>) -> StoreResult<Vec<Document>> {
        self.ensure_loaded()?;
        let mut shelf = self
            .sheets
            .write()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        shelf
            .entry(self.key.clone())
            .or_default()
            .extend(docs.iter().cloned());
        Ok(docs)
    }

    async fn update(&mut self, filter: &Filter, patch: &Document) -> StoreResult<Vec<Document>> {
        self.ensure_loaded()?;
        let mut shelf = self
            .sheets
            .write()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        let rows = shelf.entry(self.key.clone()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if matches_filter(row, filter) {
                for (column, value) in patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn update_one(
        &mut self,
        filter: &Filter,
        patch: &Document,
    ) -> StoreResult<Option<Document>> {
        self.ensure_loaded()?;
        let mut shelf = self
            .sheets
            .write()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        let rows = shelf.entry(self.key.clone()).or_default();
        for row in rows.iter_mut() {
            if matches_filter(row, filter) {
                for (column, value) in patch {
                    row.insert(column.clone(), value.clone());
                }
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn remove(&mut self, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.ensure_loaded()?;
        let mut shelf = self
            .sheets
            .write()
            .map_err(|_| StoreError::internal("sheet shelf lock poisoned"))?;
        let rows = shelf.entry(self.key.clone()).or_default();
        let mut removed = Vec::new();
        rows.retain(|row| {
            if matches_filter(row, filter) {
                removed.push(row.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
