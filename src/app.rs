//! HTTP layer: thin glue translating requests into [`SheetStore`] calls.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::codec::Dialect;
use crate::error::StoreError;
use crate::filter::{FilterSpec, SortSpec};
use crate::store::SheetStore;
use crate::workbook::Record;

pub struct AppState {
    store: SheetStore,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
        }
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadRequest {
    file_name: String,
    sheet_name: Option<String>,
    #[serde(default)]
    filter: FilterSpec,
    sort: Option<SortSpec>,
    /// `0` (the default) returns every matching record.
    #[serde(default)]
    limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRowRequest {
    file_name: String,
    sheet_name: Option<String>,
    row_data: Record,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRowRequest {
    file_name: String,
    sheet_name: Option<String>,
    key_column: String,
    key_value: Value,
    row_data: Record,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRowsRequest {
    file_name: String,
    sheet_name: Option<String>,
    #[serde(default)]
    filter: FilterSpec,
    row_data: Record,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRowsRequest {
    file_name: String,
    sheet_name: Option<String>,
    #[serde(default)]
    filter: FilterSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearRequest {
    file_name: String,
    sheet_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFileRequest {
    file_name: String,
    dialect: Option<Dialect>,
    #[serde(default)]
    columns: Vec<String>,
}

#[derive(Deserialize)]
struct SheetQuery {
    sheet: Option<String>,
}

/// Build the service router around a store.
pub fn router(store: SheetStore) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/", get(banner))
        .route("/api/files", get(list_files).post(create_file))
        .route("/api/files/:name", delete(delete_file))
        .route("/api/files/:name/sheets", get(list_sheets))
        .route("/api/files/:name/columns", get(list_columns))
        .route("/api/read", post(read_rows))
        .route("/api/add-row", post(add_row))
        .route("/api/update-row", post(update_row))
        .route("/api/update-rows", post(update_rows))
        .route("/api/delete-rows", post(delete_rows))
        .route("/api/clear", post(clear_sheet))
        .route("/api/upload", post(upload_file))
        .route("/api/download/:name", get(download_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn run(store: SheetStore, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("data directory: {}", store.data_dir().display());
    let app = router(store);
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn banner() -> &'static str {
    "sheetdb: local spreadsheet files as a record store"
}

async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, StoreError> {
    Ok(Json(state.store.list_files()?))
}

async fn create_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFileRequest>,
) -> Result<impl IntoResponse, StoreError> {
    let name = state
        .store
        .create_file(&req.file_name, req.dialect, req.columns)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "fileName": name })),
    ))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, StoreError> {
    state.store.delete_file(&name)?;
    Ok(Json(json!({ "success": true })))
}

async fn list_sheets(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, StoreError> {
    Ok(Json(state.store.list_sheets(&name)?))
}

async fn list_columns(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<SheetQuery>,
) -> Result<Json<Vec<String>>, StoreError> {
    Ok(Json(
        state.store.list_columns(&name, query.sheet.as_deref())?,
    ))
}

async fn read_rows(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReadRequest>,
) -> Result<Json<Vec<Record>>, StoreError> {
    let records = state.store.read(
        &req.file_name,
        req.sheet_name.as_deref(),
        &req.filter,
        req.sort.as_ref(),
        req.limit,
    )?;
    Ok(Json(records))
}

async fn add_row(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddRowRequest>,
) -> Result<Json<Value>, StoreError> {
    let rows = state
        .store
        .add_row(&req.file_name, req.sheet_name.as_deref(), req.row_data)?;
    Ok(Json(json!({ "success": true, "rows": rows })))
}

async fn update_row(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRowRequest>,
) -> Result<Json<Value>, StoreError> {
    state.store.update_row_by_key(
        &req.file_name,
        req.sheet_name.as_deref(),
        &req.key_column,
        &req.key_value,
        req.row_data,
    )?;
    Ok(Json(json!({ "success": true })))
}

async fn update_rows(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRowsRequest>,
) -> Result<Json<Value>, StoreError> {
    let updated = state.store.update_rows_by_filter(
        &req.file_name,
        req.sheet_name.as_deref(),
        &req.filter,
        req.row_data,
    )?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

async fn delete_rows(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteRowsRequest>,
) -> Result<Json<Value>, StoreError> {
    let deleted = state.store.delete_rows_by_filter(
        &req.file_name,
        req.sheet_name.as_deref(),
        &req.filter,
    )?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

async fn clear_sheet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<Value>, StoreError> {
    state
        .store
        .clear(&req.file_name, req.sheet_name.as_deref())?;
    Ok(Json(json!({ "success": true })))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, StoreError> {
    let mut file_name: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StoreError::invalid(e.to_string()))?
    {
        let part = field.name().unwrap_or_default().to_string();
        match part.as_str() {
            "file" => {
                if file_name.is_none() {
                    file_name = field.file_name().map(str::to_string);
                }
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| StoreError::invalid(e.to_string()))?
                        .to_vec(),
                );
            }
            // Explicit name part overrides the file part's own name.
            "fileName" => {
                file_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| StoreError::invalid(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let file_name =
        file_name.ok_or_else(|| StoreError::invalid("no file name in upload"))?;
    let data = data.ok_or_else(|| StoreError::invalid("no file data in upload"))?;
    state.store.upload(&file_name, &data)?;
    Ok(Json(json!({ "success": true, "fileName": file_name })))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let bytes = state.store.download(&name)?;
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        ),
    ];
    Ok((headers, bytes))
}
