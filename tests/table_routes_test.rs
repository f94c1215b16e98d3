//! In-process tests for table creation, seating and finishing.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use reservation_desk::domain::ports::{Clock, FixedClock};
use reservation_desk::{build_router, AppState, InMemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// Monday; the 21st is the next open day
fn make_router() -> axum::Router {
    let clock: Arc<dyn Clock> =
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()));
    let store = Arc::new(InMemoryStore::new(clock.clone()));
    build_router(AppState::in_memory(store, clock))
}

async fn call(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn create_reservation(router: &axum::Router, people: u32) -> u64 {
    let (status, body) = call(
        router,
        "POST",
        "/reservations",
        Some(json!({"data": {
            "first_name": "Rick",
            "last_name": "Sanchez",
            "mobile_number": "202-555-0164",
            "reservation_date": "2026-10-21",
            "reservation_time": "18:30",
            "people": people
        }})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["reservation_id"].as_u64().unwrap()
}

async fn create_table(router: &axum::Router, name: &str, capacity: u32) -> u64 {
    let (status, body) = call(
        router,
        "POST",
        "/tables",
        Some(json!({"data": {"table_name": name, "capacity": capacity}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["table_id"].as_u64().unwrap()
}

async fn seat(router: &axum::Router, table_id: u64, reservation_id: u64) -> (StatusCode, Value) {
    call(
        router,
        "PUT",
        &format!("/tables/{}/seat", table_id),
        Some(json!({"data": {"reservation_id": reservation_id}})),
    )
    .await
}

#[tokio::test]
async fn test_create_table_validates_name_and_capacity() {
    let router = make_router();
    let (status, body) = call(
        &router,
        "POST",
        "/tables",
        Some(json!({"data": {"table_name": "A", "capacity": 0}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid table_name. Must be at least 2 characters. \
         Invalid capacity. Must be a number greater than 0."
    );

    let (status, body) = call(
        &router,
        "POST",
        "/tables",
        Some(json!({"data": {"table_name": "Patio", "capacity": 4, "zone": "outside"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid field(s): zone");
}

#[tokio::test]
async fn test_tables_are_listed_by_name() {
    let router = make_router();
    create_table(&router, "Bar #2", 1).await;
    create_table(&router, "#1", 6).await;

    let (status, body) = call(&router, "GET", "/tables", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["#1", "Bar #2"]);
}

#[tokio::test]
async fn test_seat_and_finish_round() {
    let router = make_router();
    let reservation_id = create_reservation(&router, 4).await;
    let table_id = create_table(&router, "Patio", 4).await;

    let (status, body) = seat(&router, table_id, reservation_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reservation_id"], reservation_id);

    let (_, body) = call(&router, "GET", &format!("/reservations/{}", reservation_id), None).await;
    assert_eq!(body["data"]["status"], "seated");

    let (status, body) = call(&router, "DELETE", &format!("/tables/{}/seat", table_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["reservation_id"].is_null());

    let (_, body) = call(&router, "GET", &format!("/reservations/{}", reservation_id), None).await;
    assert_eq!(body["data"]["status"], "finished");

    // 已結束的訂位不可再變更狀態
    let (status, _) = call(
        &router,
        "PUT",
        &format!("/reservations/{}/status", reservation_id),
        Some(json!({"data": {"status": "seated"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_seat_rejects_party_larger_than_table() {
    let router = make_router();
    let reservation_id = create_reservation(&router, 6).await;
    let table_id = create_table(&router, "Bar #1", 2).await;

    let (status, body) = seat(&router, table_id, reservation_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Table Bar #1 does not have sufficient capacity.");
}

#[tokio::test]
async fn test_seat_rejects_occupied_table() {
    let router = make_router();
    let first = create_reservation(&router, 2).await;
    let second = create_reservation(&router, 2).await;
    let table_id = create_table(&router, "Window", 4).await;

    assert_eq!(seat(&router, table_id, first).await.0, StatusCode::OK);
    let (status, body) = seat(&router, table_id, second).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Table Window is occupied.");
}

#[tokio::test]
async fn test_seat_with_unknown_ids_is_404() {
    let router = make_router();
    let table_id = create_table(&router, "Window", 4).await;

    let (status, body) = seat(&router, table_id, 999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));

    let reservation_id = create_reservation(&router, 2).await;
    let (status, body) = seat(&router, 77, reservation_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Table 77 cannot be found.");
}

#[tokio::test]
async fn test_seat_without_reservation_id_is_400() {
    let router = make_router();
    let table_id = create_table(&router, "Window", 4).await;

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/tables/{}/seat", table_id),
        Some(json!({"data": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reservation_id is required");
}

#[tokio::test]
async fn test_finish_free_table_is_400() {
    let router = make_router();
    let table_id = create_table(&router, "Window", 4).await;

    let (status, body) = call(&router, "DELETE", &format!("/tables/{}/seat", table_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Table Window is not occupied.");
}
