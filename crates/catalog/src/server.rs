//! # HTTP Transport
//!
//! An axum router over a shared [`CatalogApi`]. Handlers only translate: path,
//! query and body into facade arguments, and facade results into responses.
//!
//! ## Routes
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | GET | `/api/categories` | 200, list |
//! | POST | `/api/categories` | 201 + `Location` |
//! | GET/PUT | `/api/categories/{id}` | 200 |
//! | DELETE | `/api/categories/{id}` | 204 |
//! | GET | `/api/products[?categoryId=]` | 200, list |
//! | POST | `/api/products` | 201 + `Location` |
//! | GET/PUT | `/api/products/{id}` | 200 |
//! | DELETE | `/api/products/{id}` | 204 |
//! | GET | `/api/products/bycategory/{id}` | 200, list |
//! | GET | `/api/products/byfilter/{id}?key=value&...` | 200, list |
//!
//! ## Blocking and Cancellation
//!
//! Facade calls block on storage, so each runs on the blocking pool. The
//! request's cancellation token is tied to the handler future: if the client
//! disconnects, axum drops the future, the drop guard fires, and the blocking
//! call stops at its next check.
//!
//! ## Failures
//!
//! Every failure is rendered as a problem-details body, including malformed
//! bodies, paths and query strings (400):
//!
//! ```json
//! { "title": "Operation failed", "status": 404, "detail": "...", "errors": ["..."] }
//! ```

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use catalogapp::api::CatalogApi;
use catalogapp::attributes::AttributeMap;
use catalogapp::config::CatalogConfig;
use catalogapp::dto::{CategoryDto, CategoryPostDto, ProductDto, ProductPostDto};
use catalogapp::error::CatalogError;
use catalogapp::store::backend::StorageBackend;
use catalogapp::store::fs_backend::FsBackend;
use catalogapp::store::mem_backend::MemBackend;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Backends the server can share across request tasks.
pub trait Backend: StorageBackend + Send + Sync + 'static {}

impl<B: StorageBackend + Send + Sync + 'static> Backend for B {}

type Shared<B> = Arc<CatalogApi<B>>;

const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    errors: Vec<String>,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
            errors: Vec::new(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::NotFound { .. }
            | CatalogError::CategoryNotFound(_)
            | CatalogError::NoResults(_) => StatusCode::NOT_FOUND,
            CatalogError::Validation(_) | CatalogError::InvalidAdditionalField(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage details stay in the server log.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Self::internal("The catalog could not complete the request.");
        }

        Self {
            status,
            detail: err.to_string(),
            errors: err.reasons(),
        }
    }
}

impl ApiError {
    fn bad_request(detail: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            errors: vec![detail.clone()],
            detail,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// Extractors whose rejections render as problem details.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct JsonBody<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct Path<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct Query<T>(T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            title: "Operation failed".to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Run a facade call on the blocking pool, cancelling it if the caller goes away.
async fn run_blocking<B, T, F>(api: &Shared<B>, op: F) -> Result<T, ApiError>
where
    B: Backend,
    T: Send + 'static,
    F: FnOnce(&CatalogApi<B>, &CancellationToken) -> catalogapp::error::Result<T>
        + Send
        + 'static,
{
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let api = Arc::clone(api);

    let joined = tokio::task::spawn_blocking(move || op(&api, &cancel)).await;
    guard.disarm();

    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(err) => {
            error!(error = %err, "request task failed");
            Err(ApiError::internal("The catalog could not complete the request."))
        }
    }
}

fn created<T: Serialize>(location: String, body: T) -> Response {
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

// --- Categories ---

async fn list_categories<B: Backend>(
    State(api): State<Shared<B>>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    run_blocking(&api, |api, cancel| api.categories(cancel))
        .await
        .map(Json)
}

async fn create_category<B: Backend>(
    State(api): State<Shared<B>>,
    JsonBody(dto): JsonBody<CategoryPostDto>,
) -> Result<Response, ApiError> {
    let category = run_blocking(&api, move |api, cancel| api.create_category(dto, cancel)).await?;
    Ok(created(format!("/api/categories/{}", category.id), category))
}

async fn get_category<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryDto>, ApiError> {
    run_blocking(&api, move |api, cancel| api.category(id, cancel))
        .await
        .map(Json)
}

async fn update_category<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
    JsonBody(dto): JsonBody<CategoryPostDto>,
) -> Result<Json<CategoryDto>, ApiError> {
    run_blocking(&api, move |api, cancel| api.update_category(id, dto, cancel))
        .await
        .map(Json)
}

async fn delete_category<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&api, move |api, cancel| api.delete_category(id, cancel)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Products ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductsQuery {
    category_id: Option<i64>,
}

async fn list_products<B: Backend>(
    State(api): State<Shared<B>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    run_blocking(&api, move |api, cancel| {
        api.products(query.category_id, cancel)
    })
    .await
    .map(Json)
}

async fn create_product<B: Backend>(
    State(api): State<Shared<B>>,
    JsonBody(dto): JsonBody<ProductPostDto>,
) -> Result<Response, ApiError> {
    let product = run_blocking(&api, move |api, cancel| api.create_product(dto, cancel)).await?;
    Ok(created(format!("/api/products/{}", product.id), product))
}

async fn get_product<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDto>, ApiError> {
    run_blocking(&api, move |api, cancel| api.product(id, cancel))
        .await
        .map(Json)
}

async fn update_product<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
    JsonBody(dto): JsonBody<ProductPostDto>,
) -> Result<Json<ProductDto>, ApiError> {
    run_blocking(&api, move |api, cancel| api.update_product(id, dto, cancel))
        .await
        .map(Json)
}

async fn delete_product<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&api, move |api, cancel| api.delete_product(id, cancel)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn products_by_category<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    run_blocking(&api, move |api, cancel| api.products_by_category(id, cancel))
        .await
        .map(Json)
}

/// Every query parameter is one filter pair.
async fn products_by_filter<B: Backend>(
    State(api): State<Shared<B>>,
    Path(id): Path<i64>,
    Query(filter): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    let filter = AttributeMap::from(filter);
    run_blocking(&api, move |api, cancel| {
        api.products_by_filter(id, filter, cancel)
    })
    .await
    .map(Json)
}

pub fn router<B: Backend>(api: Shared<B>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(list_categories::<B>).post(create_category::<B>),
        )
        .route(
            "/api/categories/{id}",
            get(get_category::<B>)
                .put(update_category::<B>)
                .delete(delete_category::<B>),
        )
        .route(
            "/api/products",
            get(list_products::<B>).post(create_product::<B>),
        )
        .route(
            "/api/products/{id}",
            get(get_product::<B>)
                .put(update_product::<B>)
                .delete(delete_product::<B>),
        )
        .route(
            "/api/products/bycategory/{id}",
            get(products_by_category::<B>),
        )
        .route("/api/products/byfilter/{id}", get(products_by_filter::<B>))
        .with_state(api)
}

/// Resolve once on Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(err) => {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

async fn serve<B: Backend>(api: CatalogApi<B>, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    let addr = listener.local_addr()?;
    info!(bind = %addr, policy = %api.policy(), "listening");

    axum::serve(listener, router(Arc::new(api)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

/// Start the server described by `config` and run until Ctrl-C.
pub async fn run(config: CatalogConfig) -> anyhow::Result<()> {
    let policy = config.attribute_policy;
    if config.in_memory {
        info!("using in-memory storage");
        return serve(CatalogApi::with_policy(MemBackend::new(), policy), &config.bind).await;
    }

    let path = config.data_file();
    info!(data_file = %path.display(), "using file storage");
    serve(CatalogApi::with_policy(FsBackend::new(path), policy), &config.bind).await
}
