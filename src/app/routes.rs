//! HTTP surface. Bodies travel as `{"data": ...}`; errors render as `{"error": ...}`.

use crate::app::service::ReservationQuery;
use crate::app::state::AppState;
use crate::domain::model::{Reservation, Table};
use crate::utils::error::{AppError, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

type Body = std::result::Result<Json<RequestEnvelope>, JsonRejection>;

/// 解析請求內容，JSON 錯誤一律回 400
fn envelope_data(body: Body) -> Result<Option<Value>> {
    match body {
        Ok(Json(envelope)) => Ok(envelope.data),
        Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/reservations",
            get(list_reservations).post(create_reservation),
        )
        .route(
            "/reservations/{reservation_id}",
            get(read_reservation).put(update_reservation),
        )
        .route("/reservations/{reservation_id}/status", put(update_status))
        .route("/tables", get(list_tables).post(create_table))
        .route("/tables/{table_id}/seat", put(seat_table).delete(finish_table))
        .fallback(path_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn path_not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Path not found: {}", uri.path()))
}

async fn list_reservations(
    State(state): State<AppState>,
    query: std::result::Result<Query<ReservationQuery>, QueryRejection>,
) -> Result<Json<DataBody<Vec<Reservation>>>> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let data = state.reservations.list(query).await?;
    Ok(Json(DataBody { data }))
}

async fn create_reservation(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, Json<DataBody<Reservation>>)> {
    let data = state.reservations.create(envelope_data(body)?).await?;
    Ok((StatusCode::CREATED, Json(DataBody { data })))
}

async fn read_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<DataBody<Reservation>>> {
    let data = state.reservations.read(&reservation_id).await?;
    Ok(Json(DataBody { data }))
}

async fn update_status(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    body: Body,
) -> Result<Json<DataBody<Reservation>>> {
    let data = state
        .reservations
        .update_status(&reservation_id, envelope_data(body)?)
        .await?;
    Ok(Json(DataBody { data }))
}

async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    body: Body,
) -> Result<Json<DataBody<Reservation>>> {
    let data = state
        .reservations
        .update_reservation(&reservation_id, envelope_data(body)?)
        .await?;
    Ok(Json(DataBody { data }))
}

async fn list_tables(State(state): State<AppState>) -> Result<Json<DataBody<Vec<Table>>>> {
    let data = state.tables.list().await?;
    Ok(Json(DataBody { data }))
}

async fn create_table(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, Json<DataBody<Table>>)> {
    let data = state.tables.create(envelope_data(body)?).await?;
    Ok((StatusCode::CREATED, Json(DataBody { data })))
}

async fn seat_table(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    body: Body,
) -> Result<Json<DataBody<Table>>> {
    let data = state.tables.seat(&table_id, envelope_data(body)?).await?;
    Ok(Json(DataBody { data }))
}

async fn finish_table(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<DataBody<Table>>> {
    let data = state.tables.finish(&table_id).await?;
    Ok(Json(DataBody { data }))
}
