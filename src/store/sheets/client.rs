//! Sheets API client implementing the store contract.
//!
//! `load` resolves the target sheet and pulls the whole value grid into
//! the handle; the first grid row is the header and every later row
//! becomes a Document padded to the header width. Reads filter the loaded
//! rows in memory; writes go back through the values endpoints, deletions
//! through batchUpdate.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::{ServiceAccountKey, TokenProvider};
use super::error_payload;
use crate::credentials::CredentialsProvider;
use crate::query::Filter;
use crate::store::{
    matches_filter, Document, SheetStore, StoreError, StoreFactory, StoreResult,
};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Factory producing one [`SheetsStore`] handle per request.
///
/// Credentials are resolved through the injected capability on every
/// open, so a rotated key takes effect without a restart.
pub struct SheetsStoreFactory {
    credentials: Arc<dyn CredentialsProvider>,
    http: reqwest::Client,
}

impl SheetsStoreFactory {
    pub fn new(credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl StoreFactory for SheetsStoreFactory {
    type Store = SheetsStore;

    async fn open(&self, doc_id: &str, sheet_name: Option<&str>) -> StoreResult<SheetsStore> {
        let key_file = self.credentials.key_file();
        let key = ServiceAccountKey::from_file(&key_file)?;
        Ok(SheetsStore::new(
            doc_id,
            sheet_name,
            key,
            self.http.clone(),
        ))
    }
}

/// Sheet metadata and rows established by `load`.
struct LoadedSheet {
    title: String,
    sheet_id: i64,
    header: Vec<String>,
    rows: Vec<Document>,
}

/// Handle on one sheet of one spreadsheet.
pub struct SheetsStore {
    doc_id: String,
    requested_sheet: Option<String>,
    auth: TokenProvider,
    http: reqwest::Client,
    loaded: Option<LoadedSheet>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

impl SheetsStore {
    pub fn new(
        doc_id: &str,
        sheet_name: Option<&str>,
        key: ServiceAccountKey,
        http: reqwest::Client,
    ) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            requested_sheet: sheet_name.map(String::from),
            auth: TokenProvider::new(key, http.clone()),
            http,
            loaded: None,
        }
    }

    fn loaded(&self) -> StoreResult<&LoadedSheet> {
        self.loaded
            .as_ref()
            .ok_or_else(|| StoreError::internal("sheet accessed before load"))
    }

    fn loaded_mut(&mut self) -> StoreResult<&mut LoadedSheet> {
        self.loaded
            .as_mut()
            .ok_or_else(|| StoreError::internal("sheet accessed before load"))
    }

    /// One authenticated call; non-success responses become transport
    /// errors carrying the API's `error` payload.
    async fn call(&mut self, method: Method, url: String, body: Option<Value>) -> StoreResult<Value> {
        let token = self.auth.bearer().await?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = &body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::internal(format!("sheets request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(StoreError::transport(status.as_u16(), error_payload(body)));
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| StoreError::internal(format!("sheets response decode failed: {err}")))
    }

    async fn write_header(&mut self, title: &str, header: &[String]) -> StoreResult<()> {
        let cells: Vec<Value> = header
            .iter()
            .map(|name| Value::String(name.clone()))
            .collect();
        let url = format!(
            "{API_BASE}/{}/values/{}?valueInputOption=RAW",
            enc(&self.doc_id),
            enc(&header_range(title)),
        );
        self.call(
            Method::PUT,
            url,
            Some(json!({"majorDimension": "ROWS", "values": [cells]})),
        )
        .await?;
        Ok(())
    }

    /// Shared body of `update` and `update_one`.
    async fn apply_patch(
        &mut self,
        filter: &Filter,
        patch: &Document,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let (title, mut header, rows) = {
            let sheet = self.loaded()?;
            (sheet.title.clone(), sheet.header.clone(), sheet.rows.clone())
        };

        let grew = extend_header(&mut header, patch.keys());
        if grew {
            self.write_header(&title, &header).await?;
        }

        let mut writes: Vec<(usize, Vec<Value>)> = Vec::new();
        let mut updated = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if limit.is_some_and(|cap| updated.len() >= cap) {
                break;
            }
            if !matches_filter(row, filter) {
                continue;
            }
            let mut next = row.clone();
            for (column, value) in patch {
                next.insert(column.clone(), value.clone());
            }
            let cells = doc_to_cells(&header, &next);
            updated.push(row_to_doc(&header, &cells));
            writes.push((index, cells));
        }

        for (index, cells) in &writes {
            let url = format!(
                "{API_BASE}/{}/values/{}?valueInputOption=RAW",
                enc(&self.doc_id),
                enc(&row_range(&title, grid_row(*index))),
            );
            self.call(
                Method::PUT,
                url,
                Some(json!({"majorDimension": "ROWS", "values": [cells]})),
            )
            .await?;
        }

        let sheet = self.loaded_mut()?;
        sheet.header = header;
        for ((index, _), row) in writes.iter().zip(updated.iter()) {
            sheet.rows[*index] = row.clone();
        }
        Ok(updated)
    }
}

#[async_trait]
impl SheetStore for SheetsStore {
    async fn load(&mut self) -> StoreResult<()> {
        let meta_url = format!(
            "{API_BASE}/{}?fields=sheets.properties",
            enc(&self.doc_id)
        );
        let meta: SpreadsheetMeta = serde_json::from_value(
            self.call(Method::GET, meta_url, None).await?,
        )
        .map_err(|err| StoreError::internal(format!("sheet metadata decode failed: {err}")))?;

        let properties = match &self.requested_sheet {
            Some(name) => meta
                .sheets
                .iter()
                .map(|sheet| &sheet.properties)
                .find(|properties| properties.title == *name)
                .ok_or_else(|| {
                    StoreError::transport(
                        400,
                        json!({
                            "code": 400,
                            "message": format!("Unable to resolve sheet: {name}"),
                            "status": "INVALID_ARGUMENT",
                        }),
                    )
                })?,
            None => meta
                .sheets
                .first()
                .map(|sheet| &sheet.properties)
                .ok_or_else(|| StoreError::internal("spreadsheet has no sheets"))?,
        };
        let title = properties.title.clone();
        let sheet_id = properties.sheet_id;

        let grid_url = format!(
            "{API_BASE}/{}/values/{}?majorDimension=ROWS",
            enc(&self.doc_id),
            enc(&sheet_range(&title)),
        );
        let grid = self.call(Method::GET, grid_url, None).await?;
        let mut values = match grid.get("values") {
            Some(Value::Array(rows)) => rows.clone().into_iter(),
            _ => Vec::new().into_iter(),
        };
        let header: Vec<String> = match values.next() {
            Some(Value::Array(cells)) => cells.into_iter().map(cell_text).collect(),
            _ => Vec::new(),
        };
        let rows = values
            .map(|row| match row {
                Value::Array(cells) => row_to_doc(&header, &cells),
                _ => row_to_doc(&header, &[]),
            })
            .collect();

        self.loaded = Some(LoadedSheet {
            title,
            sheet_id,
            header,
            rows,
        });
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let sheet = self.loaded()?;
        Ok(sheet
            .rows
            .iter()
            .filter(|row| matches_filter(row, filter))
            .cloned()
            .collect())
    }

    async fn insert(&mut self, docs: Vec<Document>) -> StoreResult<Vec<Document>> {
        let (title, mut header) = {
            let sheet = self.loaded()?;
            (sheet.title.clone(), sheet.header.clone())
        };

        let grew = docs
            .iter()
            .fold(false, |grew, doc| extend_header(&mut header, doc.keys()) || grew);
        if grew {
            self.write_header(&title, &header).await?;
        }

        let mut value_rows = Vec::new();
        let mut stored = Vec::new();
        for doc in &docs {
            let cells = doc_to_cells(&header, doc);
            stored.push(row_to_doc(&header, &cells));
            value_rows.push(Value::Array(cells));
        }

        let url = format!(
            "{API_BASE}/{}/values/{}:append?valueInputOption=RAW",
            enc(&self.doc_id),
            enc(&sheet_range(&title)),
        );
        self.call(
            Method::POST,
            url,
            Some(json!({"majorDimension": "ROWS", "values": value_rows})),
        )
        .await?;

        let sheet = self.loaded_mut()?;
        sheet.header = header;
        sheet.rows.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(&mut self, filter: &Filter, patch: &Document) -> StoreResult<Vec<Document>> {
        self.apply_patch(filter, patch, None).await
    }

    async fn update_one(
        &mut self,
        filter: &Filter,
        patch: &Document,
    ) -> StoreResult<Option<Document>> {
        let mut updated = self.apply_patch(filter, patch, Some(1)).await?;
        Ok(updated.pop())
    }

    async fn remove(&mut self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let (sheet_id, rows) = {
            let sheet = self.loaded()?;
            (sheet.sheet_id, sheet.rows.clone())
        };

        let mut indices = Vec::new();
        let mut removed = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if matches_filter(row, filter) {
                indices.push(index);
                removed.push(row.clone());
            }
        }
        if indices.is_empty() {
            return Ok(removed);
        }

        // Bottom-up so earlier deletions do not shift later row indices.
        let requests: Vec<Value> = indices
            .iter()
            .rev()
            .map(|index| {
                json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": grid_row(*index) - 1,
                            "endIndex": grid_row(*index),
                        }
                    }
                })
            })
            .collect();
        let url = format!("{API_BASE}/{}:batchUpdate", enc(&self.doc_id));
        self.call(Method::POST, url, Some(json!({"requests": requests})))
            .await?;

        let sheet = self.loaded_mut()?;
        for index in indices.iter().rev() {
            sheet.rows.remove(*index);
        }
        Ok(removed)
    }
}

/// Percent-encode one URL path segment.
fn enc(part: &str) -> String {
    urlencoding::encode(part).into_owned()
}

/// A1 reference to the whole sheet, with the title quoted.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn header_range(title: &str) -> String {
    format!("{}!1:1", sheet_range(title))
}

fn row_range(title: &str, row: usize) -> String {
    format!("{}!{row}:{row}", sheet_range(title))
}

/// 1-based grid row for a 0-based data row; row 1 is the header.
fn grid_row(index: usize) -> usize {
    index + 2
}

/// Render one grid cell as text; the grid stores everything as strings.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build a Document from grid cells, padded to the header width.
fn row_to_doc(header: &[String], cells: &[Value]) -> Document {
    header
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let text = cells
                .get(index)
                .cloned()
                .map(cell_text)
                .unwrap_or_default();
            (name.clone(), Value::String(text))
        })
        .collect()
}

/// Flatten a Document onto the header columns; unknown columns are the
/// caller's job (see `extend_header`).
fn doc_to_cells(header: &[String], doc: &Document) -> Vec<Value> {
    header
        .iter()
        .map(|name| {
            let text = doc
                .get(name)
                .cloned()
                .map(cell_text)
                .unwrap_or_default();
            Value::String(text)
        })
        .collect()
}

/// Append unseen columns; true when the header grew.
fn extend_header<'a>(header: &mut Vec<String>, columns: impl Iterator<Item = &'a String>) -> bool {
    let mut grew = false;
    for column in columns {
        if !header.iter().any(|existing| existing == column) {
            header.push(column.clone());
            grew = true;
        }
    }
    grew
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header() -> Vec<String> {
        vec!["name".to_string(), "age".to_string()]
    }

    #[test]
    fn test_row_to_doc_pads_short_rows() {
        let doc = row_to_doc(&header(), &[json!("John")]);
        assert_eq!(Value::Object(doc), json!({"name": "John", "age": ""}));
    }

    #[test]
    fn test_row_to_doc_stringifies_scalars() {
        let doc = row_to_doc(&header(), &[json!("John"), json!(25)]);
        assert_eq!(doc["age"], json!("25"));
    }

    #[test]
    fn test_doc_to_cells_follows_header_order() {
        let mut doc = Document::new();
        doc.insert("age".to_string(), json!(25));
        doc.insert("name".to_string(), json!("John"));
        let cells = doc_to_cells(&header(), &doc);
        assert_eq!(cells, vec![json!("John"), json!("25")]);
    }

    #[test]
    fn test_doc_to_cells_blanks_missing_columns() {
        let mut doc = Document::new();
        doc.insert("name".to_string(), json!("John"));
        let cells = doc_to_cells(&header(), &doc);
        assert_eq!(cells, vec![json!("John"), json!("")]);
    }

    #[test]
    fn test_extend_header_appends_unseen_columns() {
        let mut columns = header();
        let mut doc = Document::new();
        doc.insert("age".to_string(), json!(1));
        doc.insert("team".to_string(), json!("core"));
        assert!(extend_header(&mut columns, doc.keys()));
        assert_eq!(columns, vec!["name", "age", "team"]);
        assert!(!extend_header(&mut columns, doc.keys()));
    }

    #[test]
    fn test_sheet_ranges_quote_titles() {
        assert_eq!(sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(sheet_range("Bob's data"), "'Bob''s data'");
        assert_eq!(header_range("Sheet1"), "'Sheet1'!1:1");
        assert_eq!(row_range("Sheet1", 5), "'Sheet1'!5:5");
    }

    #[test]
    fn test_grid_row_accounts_for_header() {
        assert_eq!(grid_row(0), 2);
        assert_eq!(grid_row(3), 5);
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(cell_text(json!("x")), "x");
        assert_eq!(cell_text(json!(25)), "25");
        assert_eq!(cell_text(json!(true)), "true");
        assert_eq!(cell_text(Value::Null), "");
    }
}
