//! Route dispatcher.
//!
//! One axum router per server; every request runs the same sequence:
//! resolve the path, open a store handle through the factory, `load`,
//! run the verb operation, then shape the result or normalize the
//! failure into a JSON response. CORS headers apply to every response,
//! error responses included.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ServerConfig;
use crate::query::{self, Filter};
use crate::store::{Document, SheetStore, StoreFactory};

use super::errors::{ApiError, ApiResult};
use super::response::drop_empty_rows;

/// REST server over one store factory.
pub struct ApiServer<F: StoreFactory> {
    factory: Arc<F>,
    config: ServerConfig,
}

/// Shared state type
type ServerState<F> = Arc<ApiServer<F>>;

impl<F: StoreFactory + 'static> ApiServer<F> {
    pub fn new(factory: F, config: ServerConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            config,
        }
    }

    /// Build the axum router
    pub fn router(self) -> Router {
        let cors = build_cors(&self.config);
        let state = Arc::new(self);

        let verbs = || {
            get(find_rows)
                .post(insert_rows)
                .put(update_rows)
                .patch(patch_row)
                .delete(remove_rows)
                .options(options_no_content)
        };

        Router::new()
            .route("/api/:doc_id", verbs())
            .route("/api/:doc_id/:sheet_name", verbs())
            .with_state(state)
            .layer(cors)
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.socket_addr();
        let router = self.router();

        log::info!("listening on {addr}");
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await
    }
}

/// Permissive CORS unless origins are configured.
fn build_cors(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Path parameters; the sheet segment is optional.
#[derive(Debug, Deserialize)]
struct SheetPath {
    doc_id: String,
    #[serde(default)]
    sheet_name: Option<String>,
}

/// Open a store handle and establish sheet metadata.
async fn open_loaded<F: StoreFactory>(
    server: &ApiServer<F>,
    path: &SheetPath,
) -> ApiResult<F::Store> {
    let mut store = server
        .factory
        .open(&path.doc_id, path.sheet_name.as_deref())
        .await?;
    store.load().await?;
    Ok(store)
}

fn parse_filter(raw: &Option<String>) -> Filter {
    query::parse(raw.as_deref().unwrap_or(""))
}

/// GET: find matching rows, hiding blank spreadsheet rows.
async fn find_rows<F: StoreFactory + 'static>(
    State(server): State<ServerState<F>>,
    Path(path): Path<SheetPath>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Json<Vec<Document>>> {
    let filter = parse_filter(&raw);
    let store = open_loaded(&server, &path).await?;
    let rows = store.find(&filter).await?;
    Ok(Json(drop_empty_rows(rows)))
}

/// POST: insert one document or a batch.
async fn insert_rows<F: StoreFactory + 'static>(
    State(server): State<ServerState<F>>,
    Path(path): Path<SheetPath>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Vec<Document>>)> {
    let docs = normalize_insert_body(body)?;
    let mut store = open_loaded(&server, &path).await?;
    let inserted = store.insert(docs).await?;
    Ok((StatusCode::CREATED, Json(inserted)))
}

/// PUT: patch every matching row.
async fn update_rows<F: StoreFactory + 'static>(
    State(server): State<ServerState<F>>,
    Path(path): Path<SheetPath>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> ApiResult<Json<Vec<Document>>> {
    let filter = parse_filter(&raw);
    let patch = as_patch(body)?;
    let mut store = open_loaded(&server, &path).await?;
    let updated = store.update(&filter, &patch).await?;
    Ok(Json(updated))
}

/// PATCH: patch the first matching row, 404 when nothing matches.
async fn patch_row<F: StoreFactory + 'static>(
    State(server): State<ServerState<F>>,
    Path(path): Path<SheetPath>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> ApiResult<Json<Document>> {
    let filter = parse_filter(&raw);
    let patch = as_patch(body)?;
    let mut store = open_loaded(&server, &path).await?;
    match store.update_one(&filter, &patch).await? {
        Some(updated) => Ok(Json(updated)),
        None => Err(ApiError::DocumentNotFound),
    }
}

/// DELETE: remove matching rows. A non-empty JSON object body is the
/// deliberate criteria form and overrides the query string.
async fn remove_rows<F: StoreFactory + 'static>(
    State(server): State<ServerState<F>>,
    Path(path): Path<SheetPath>,
    RawQuery(raw): RawQuery,
    body: Bytes,
) -> ApiResult<Json<Vec<Document>>> {
    let mut filter = parse_filter(&raw);
    if !body.is_empty() {
        if let Ok(Value::Object(criteria)) = serde_json::from_slice::<Value>(&body) {
            if !criteria.is_empty() {
                filter = criteria;
            }
        }
    }
    let mut store = open_loaded(&server, &path).await?;
    let removed = store.remove(&filter).await?;
    Ok(Json(removed))
}

/// Plain OPTIONS (CORS preflights are answered by the CORS layer).
async fn options_no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// An object body is a singleton insert, an array body a bulk insert.
fn normalize_insert_body(body: Value) -> ApiResult<Vec<Document>> {
    match body {
        Value::Object(doc) => Ok(vec![doc]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(doc) => Ok(doc),
                other => Err(ApiError::InvalidBody(format!(
                    "expected an object row, got {}",
                    kind(&other)
                ))),
            })
            .collect(),
        other => Err(ApiError::InvalidBody(format!(
            "expected an object or array body, got {}",
            kind(&other)
        ))),
    }
}

/// A patch body must be a single object.
fn as_patch(body: Value) -> ApiResult<Document> {
    match body {
        Value::Object(doc) => Ok(doc),
        other => Err(ApiError::InvalidBody(format!(
            "expected an object body, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStoreFactory;
    use serde_json::json;

    #[test]
    fn test_router_construction() {
        let server = ApiServer::new(MemoryStoreFactory::new(), ServerConfig::default());
        let _router = server.router();
    }

    #[test]
    fn test_singleton_insert_normalization() {
        let docs = normalize_insert_body(json!({"name": "Mike"})).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("Mike"));
    }

    #[test]
    fn test_bulk_insert_normalization() {
        let docs =
            normalize_insert_body(json!([{"name": "Mike"}, {"name": "Sarah"}])).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_scalar_insert_body_rejected() {
        assert!(matches!(
            normalize_insert_body(json!("Mike")),
            Err(ApiError::InvalidBody(_))
        ));
        assert!(matches!(
            normalize_insert_body(json!([{"name": "Mike"}, 42])),
            Err(ApiError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_patch_body_must_be_object() {
        assert!(as_patch(json!({"age": "26"})).is_ok());
        assert!(matches!(
            as_patch(json!(["age"])),
            Err(ApiError::InvalidBody(_))
        ));
    }
}
