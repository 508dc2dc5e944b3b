//! Row-store contract and bundled implementations.
//!
//! The translation layer consumes the backing store through
//! [`SheetStore`]; [`StoreFactory`] builds one handle per request.
//! `sheets` talks to the Google Sheets API; `memory` backs tests and
//! local development.

mod errors;
mod matching;
pub mod memory;
pub mod sheets;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use errors::{StoreError, StoreResult};
pub use matching::matches_filter;
pub use memory::{MemorySheetStore, MemoryStoreFactory};
pub use sheets::{SheetsStore, SheetsStoreFactory};

use crate::query::Filter;

/// One spreadsheet row: column name to scalar value, in header order.
pub type Document = Map<String, Value>;

/// Sheet used when the URL does not name one.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Row-level operations against one sheet.
///
/// `load` must run before any other operation; it establishes the header
/// row and sheet bounds the handle works against.
#[async_trait]
pub trait SheetStore: Send {
    /// Establish sheet metadata; fails if auth or sheet access fails.
    async fn load(&mut self) -> StoreResult<()>;

    /// All rows matching the filter; an empty filter matches every row.
    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Append rows and return them as stored.
    async fn insert(&mut self, docs: Vec<Document>) -> StoreResult<Vec<Document>>;

    /// Patch every matching row; returns the updated rows.
    async fn update(&mut self, filter: &Filter, patch: &Document) -> StoreResult<Vec<Document>>;

    /// Patch at most one matching row; `None` when nothing matches.
    async fn update_one(
        &mut self,
        filter: &Filter,
        patch: &Document,
    ) -> StoreResult<Option<Document>>;

    /// Delete matching rows and return them.
    async fn remove(&mut self, filter: &Filter) -> StoreResult<Vec<Document>>;
}

/// Builds a fresh store handle per request; no pooling happens here.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    type Store: SheetStore;

    /// Open a handle on `(doc_id, sheet_name)`; `load` has not run yet.
    async fn open(&self, doc_id: &str, sheet_name: Option<&str>) -> StoreResult<Self::Store>;
}
