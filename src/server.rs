use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde_json::Value;

use crate::AppState;
use crate::constants::*;
use crate::local_store::StoreError;
use crate::remote::{Filter, Order, TableQuery};

type HandlerError = (StatusCode, String);

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => (StatusCode::CONFLICT, e.to_string()),
            StoreError::InvalidRow(message) => (StatusCode::BAD_REQUEST, message),
            StoreError::Database(message) => {
                tracing::error!(error = %message, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ERR_DATABASE_OPERATION.to_string(),
                )
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            &format!("{}/{{table}}", REST_PATH_PREFIX),
            get(select_rows)
                .post(insert_rows)
                .patch(update_rows)
                .delete(delete_rows),
        )
        .with_state(state)
}

fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), HandlerError> {
    let Some(expected) = &state.api_key else {
        return Ok(());
    };
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err((StatusCode::UNAUTHORIZED, ERR_INVALID_API_KEY.to_string()));
    }
    Ok(())
}

pub fn validate_table(table: &str) -> Result<(), HandlerError> {
    if KNOWN_TABLES.contains(&table) {
        Ok(())
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("relation \"{}\" does not exist", table),
        ))
    }
}

/// Splits query parameters into equality filters and an optional ordering.
pub fn parse_table_query(params: &[(String, String)]) -> Result<TableQuery, HandlerError> {
    let mut query = TableQuery::new();
    for (key, value) in params {
        match key.as_str() {
            "select" => {
                if value != "*" {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        "Only select=* is supported".to_string(),
                    ));
                }
            }
            "order" => {
                let order = Order::parse(value).ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Invalid order parameter '{}'", value),
                    )
                })?;
                query = query.order(order);
            }
            column => {
                let filter_value = value.strip_prefix("eq.").ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Unsupported filter operator for column '{}'", column),
                    )
                })?;
                query = query.filter(Filter::eq(column, filter_value));
            }
        }
    }
    Ok(query)
}

pub async fn select_rows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<Vec<Value>>), HandlerError> {
    check_api_key(&state, &headers)?;
    validate_table(&table)?;
    let query = parse_table_query(&params)?;

    let rows = state.store.select_rows(&table, &query).await?;
    tracing::debug!(table = %table, count = rows.len(), "select");

    Ok((StatusCode::OK, Json(rows)))
}

pub async fn insert_rows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Json(payload): Json<Value>,
) -> Result<StatusCode, HandlerError> {
    check_api_key(&state, &headers)?;
    validate_table(&table)?;

    let rows = match payload {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    let inserted = state.store.insert_rows(&table, rows).await?;
    tracing::info!(table = %table, inserted, "insert");

    Ok(StatusCode::CREATED)
}

pub async fn update_rows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    Json(fields): Json<Value>,
) -> Result<StatusCode, HandlerError> {
    check_api_key(&state, &headers)?;
    validate_table(&table)?;
    let query = parse_table_query(&params)?;

    let updated = state
        .store
        .update_rows(&table, fields, &query.filters)
        .await?;
    tracing::info!(table = %table, updated, "update");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_rows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<StatusCode, HandlerError> {
    check_api_key(&state, &headers)?;
    validate_table(&table)?;
    let query = parse_table_query(&params)?;

    let deleted = state.store.delete_rows(&table, &query.filters).await?;
    tracing::info!(table = %table, deleted, "delete");

    Ok(StatusCode::NO_CONTENT)
}
