use std::net::SocketAddr;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use plantstore_db::error::StoreError;
use plantstore_db::models::NewPlant;
use plantstore_db::queries::plants;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: StoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

/// Wire shape of a create-plant body.
///
/// Key presence is checked on the raw JSON object before this struct is
/// parsed, so here `None` means an explicit null. `price` stays a raw
/// value because both numeric literals and strings are accepted; unknown
/// fields are rejected outright.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreatePlantRequest {
    name: Option<String>,
    image: Option<String>,
    #[serde(default)]
    price: serde_json::Value,
}

/// A rejected create-plant body. The Display text is the message returned
/// in the 400 response.
#[derive(Debug, Error)]
enum ValidationError {
    #[error("Request body must be valid JSON")]
    InvalidJson,
    #[error("Invalid request body: {0}")]
    Schema(#[source] serde_json::Error),
    #[error("Missing required fields: 'name', 'image', and 'price'")]
    MissingFields,
    #[error("Name, image, and price cannot be empty.")]
    EmptyField,
    #[error("Price must be a valid number.")]
    InvalidPrice,
}

/// Validate a create-plant body, failing on the first violated constraint:
/// well-formed JSON, schema shape, all keys present, no empty values,
/// parseable price.
fn parse_create_request(body: &[u8]) -> Result<NewPlant, ValidationError> {
    let raw: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;

    let keys_present = raw.as_object().is_some_and(|obj| {
        ["name", "image", "price"]
            .iter()
            .all(|key| obj.contains_key(*key))
    });
    if !keys_present {
        return Err(ValidationError::MissingFields);
    }

    let request: CreatePlantRequest =
        serde_json::from_value(raw).map_err(ValidationError::Schema)?;

    // A key that was present with an explicit null lands here as None/Null.
    let name = request.name.unwrap_or_default();
    let image = request.image.unwrap_or_default();
    if name.is_empty() || image.is_empty() || request.price.is_null() {
        return Err(ValidationError::EmptyField);
    }

    // Accept numeric literals and strings alike by going through the string
    // representation before fixed-point parsing.
    let text = match &request.price {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_owned(),
        _ => return Err(ValidationError::InvalidPrice),
    };
    let mut price: Decimal = text.parse().map_err(|_| ValidationError::InvalidPrice)?;
    // The column is NUMERIC(10,2); normalize to that scale up front so the
    // response body already carries the stored representation.
    price.rescale(2);

    Ok(NewPlant { name, image, price })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/plants", get(list_plants).post(create_plant))
        .route("/plants/{id}", get(get_plant_by_id).delete(delete_plant))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("plantstore serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("plantstore serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\
<html><head><title>Plant Store API</title></head><body>\
<h1>Plant Store API</h1>\
<p><a href=\"/plants\">/plants</a></p>\
</body></html>",
    )
}

async fn list_plants(State(pool): State<PgPool>) -> Result<axum::response::Response, AppError> {
    let plants = plants::list_plants(&pool)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(plants).into_response())
}

async fn get_plant_by_id(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<axum::response::Response, AppError> {
    let plant = plants::get_plant(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("Plant with id {id} not found")))?;

    Ok(Json(plant).into_response())
}

async fn create_plant(
    State(pool): State<PgPool>,
    body: Bytes,
) -> Result<axum::response::Response, AppError> {
    let new = parse_create_request(&body)?;

    let plant = match plants::insert_plant(&pool, &new).await {
        Ok(plant) => plant,
        Err(err) if err.is_integrity() => {
            // Unreachable with the current schema (the only constraint is the
            // store-assigned primary key), kept as a defensive branch.
            return Err(AppError::bad_request(
                "Failed to create plant due to data integrity issue.",
            ));
        }
        Err(err) => return Err(AppError::internal(err)),
    };

    Ok((StatusCode::CREATED, Json(plant)).into_response())
}

async fn delete_plant(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<axum::response::Response, AppError> {
    let deleted = plants::delete_plant(&pool, id)
        .await
        .map_err(AppError::internal)?;

    if !deleted {
        return Err(AppError::not_found(format!("Plant with id {id} not found")));
    }

    let body = serde_json::json!({
        "message": format!("Plant with id {id} successfully deleted")
    });
    Ok(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use plantstore_test_utils::{create_test_db, drop_test_db};

    use super::{ValidationError, parse_create_request};

    // -----------------------------------------------------------------------
    // Validation unit tests (no database)
    // -----------------------------------------------------------------------

    #[test]
    fn parse_accepts_string_price() {
        let new = parse_create_request(
            br#"{"name":"Aloe","image":"./images/aloe.jpg","price":"11.50"}"#,
        )
        .expect("valid body should parse");
        assert_eq!(new.name, "Aloe");
        assert_eq!(new.image, "./images/aloe.jpg");
        assert_eq!(new.price.to_string(), "11.50");
    }

    #[test]
    fn parse_normalizes_numeric_price_to_two_places() {
        let new = parse_create_request(br#"{"name":"Aloe","image":"x","price":11.5}"#)
            .expect("numeric price should parse");
        assert_eq!(new.price.to_string(), "11.50");
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse_create_request(b"not json").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson));
    }

    #[test]
    fn parse_rejects_non_object_body() {
        let err = parse_create_request(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields));
    }

    #[test]
    fn parse_rejects_wrongly_typed_name() {
        let err =
            parse_create_request(br#"{"name":5,"image":"x","price":"1.00"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }

    #[test]
    fn parse_rejects_unknown_field() {
        let err = parse_create_request(
            br#"{"name":"Aloe","image":"x","price":"1.00","color":"green"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }

    #[test]
    fn missing_key_is_reported_before_empty_value() {
        // name is empty AND price is missing: the key check comes first.
        let err = parse_create_request(br#"{"name":"","image":"x"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields));
    }

    #[test]
    fn parse_rejects_empty_name_and_image() {
        let err = parse_create_request(br#"{"name":"","image":"x","price":"1.00"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField));

        let err = parse_create_request(br#"{"name":"Aloe","image":"","price":"1.00"}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField));
    }

    #[test]
    fn parse_rejects_null_price() {
        let err =
            parse_create_request(br#"{"name":"Aloe","image":"x","price":null}"#).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField));
    }

    #[test]
    fn parse_rejects_non_numeric_price() {
        let err = parse_create_request(br#"{"name":"Aloe","image":"x","price":"cheap"}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrice));

        let err =
            parse_create_request(br#"{"name":"Aloe","image":"x","price":true}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrice));
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send_get(pool: PgPool, uri: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn send_post(pool: PgPool, uri: &str, body: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn send_delete(pool: PgPool, uri: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_returns_html() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap()
            .to_owned();
        assert!(
            content_type.contains("text/html"),
            "content-type should contain text/html, got: {content_type}"
        );
        let bytes = axum::body::to_bytes(resp.into_body(), 1_048_576)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Plant Store API"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_plants_empty() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/plants").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(
            pool.clone(),
            "/plants",
            r#"{"name":"Aloe","image":"./images/aloe.jpg","price":"11.50"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(
            created,
            serde_json::json!({
                "id": 1,
                "name": "Aloe",
                "image": "./images/aloe.jpg",
                "price": "11.50"
            })
        );

        let resp = send_get(pool.clone(), "/plants/1").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched = body_json(resp).await;
        assert_eq!(fetched, created);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_with_numeric_price_reads_back_two_places() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(
            pool.clone(),
            "/plants",
            r#"{"name":"ZZ Plant","image":"./images/zz-plant.jpg","price":25.9}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["price"], "25.90");

        // Every subsequent read renders the same two-place value.
        let id = created["id"].as_i64().unwrap();
        let resp = send_get(pool.clone(), &format!("/plants/{id}")).await;
        let fetched = body_json(resp).await;
        assert_eq!(fetched["price"], "25.90");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_missing_field_persists_nothing() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(pool.clone(), "/plants", r#"{"name":"Aloe"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(
            json["error"],
            "Missing required fields: 'name', 'image', and 'price'"
        );

        let resp = send_get(pool.clone(), "/plants").await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]), "no record should be persisted");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_empty_name_returns_400() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(
            pool.clone(),
            "/plants",
            r#"{"name":"","image":"./images/aloe.jpg","price":"11.50"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Name, image, and price cannot be empty.");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_non_numeric_price_returns_400() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(
            pool.clone(),
            "/plants",
            r#"{"name":"Aloe","image":"./images/aloe.jpg","price":"cheap"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Price must be a valid number.");

        let resp = send_get(pool.clone(), "/plants").await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]), "no record should be persisted");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_invalid_json_returns_400() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(pool.clone(), "/plants", "this is not json").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Request body must be valid JSON");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_get_plant_not_found() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/plants/999").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Plant with id 999 not found");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_404() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_post(
            pool.clone(),
            "/plants",
            r#"{"name":"Aloe","image":"./images/aloe.jpg","price":"11.50"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send_delete(pool.clone(), "/plants/1").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Plant with id 1 successfully deleted");

        // No resurrection: both GET and a second DELETE see the id as gone.
        let resp = send_get(pool.clone(), "/plants/1").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Plant with id 1 not found");

        let resp = send_delete(pool.clone(), "/plants/1").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_count_tracks_creates_and_deletes() {
        let (pool, db_name) = create_test_db().await;

        for name in ["Aloe", "ZZ Plant", "Fern"] {
            let body = format!(r#"{{"name":"{name}","image":"./images/x.jpg","price":"5.00"}}"#);
            let resp = send_post(pool.clone(), "/plants", &body).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = send_delete(pool.clone(), "/plants/2").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send_get(pool.clone(), "/plants").await;
        let json = body_json(resp).await;
        let arr = json.as_array().expect("response should be an array");
        assert_eq!(arr.len(), 2, "3 creates minus 1 delete");

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
