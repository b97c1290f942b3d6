use crate::auth::{AuthClient, Profile};
use crate::checkout::OrderFactory;
use crate::error::{BoxError, OrderingError};
use crate::model::{Cart, CartItem, CustomerDetails, FieldError, Order};
use crate::storage::{OrderStore, RemoteCartStore};
use crate::tracker::OrderProgress;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use common::config::ServerConfig;
use http::header;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<dyn RemoteCartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub factory: Arc<OrderFactory>,
    pub auth: Arc<dyn AuthClient>,
}

impl AppState {
    pub fn new(
        carts: Arc<dyn RemoteCartStore>,
        orders: Arc<dyn OrderStore>,
        auth: Arc<dyn AuthClient>,
    ) -> Self {
        let factory = Arc::new(OrderFactory::new(carts.clone(), orders.clone()));
        Self {
            carts,
            orders,
            factory,
            auth,
        }
    }
}

impl IntoResponse for OrderingError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            OrderingError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Invalid customer details", "errors": fields }),
            ),
            OrderingError::EmptyCart => {
                (StatusCode::BAD_REQUEST, json!({ "message": "Cart is empty" }))
            }
            OrderingError::Auth => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid or expired session" }),
            ),
            OrderingError::NotFound => {
                (StatusCode::NOT_FOUND, json!({ "message": "Order not found" }))
            }
            OrderingError::Sync(_) | OrderingError::Storage(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Resolve the bearer credential in the `Authorization` header to a profile.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Profile, OrderingError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(OrderingError::Auth)?;

    state.auth.validate(token).await?.ok_or(OrderingError::Auth)
}

#[derive(Debug, Serialize, Deserialize)]
struct CartBody {
    items: Vec<CartItem>,
}

async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartBody>, OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    let cart = state.carts.fetch(profile.account_id).await?;
    Ok(Json(CartBody { items: cart.items }))
}

async fn put_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CartBody>,
) -> Result<Json<CartBody>, OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    // A quantity-zero line means "removed", never a stored zero.
    let items: Vec<CartItem> = body.items.into_iter().filter(|i| i.quantity > 0).collect();
    let stored = state
        .carts
        .replace(profile.account_id, &Cart { items })
        .await?;
    Ok(Json(CartBody {
        items: stored.items,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    customer_details: CustomerDetails,
    /// Client-generated idempotency token for this checkout attempt.
    /// Re-submitting with the same token returns the already-created order.
    #[serde(default)]
    checkout_token: Option<String>,
}

async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    // Only the client knows whether two submissions are the same attempt, so
    // a missing token is rejected rather than replaced with a server-minted
    // one that would make every retry look like a fresh checkout.
    let token = body
        .checkout_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            OrderingError::Validation(vec![FieldError::new(
                "checkoutToken",
                "Checkout token is required",
            )])
        })?;

    let order = state
        .factory
        .create_order(profile.account_id, &body.customer_details, &token)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    let orders = state.orders.list(profile.account_id).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    let order = state
        .orders
        .get(profile.account_id, order_id)
        .await?
        .ok_or(OrderingError::NotFound)?;
    Ok(Json(order))
}

/// Pipeline-progress view of a single order.
async fn get_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderProgress>, OrderingError> {
    let profile = authenticate(&state, &headers).await?;
    let order = state
        .orders
        .get(profile.account_id, order_id)
        .await?
        .ok_or(OrderingError::NotFound)?;
    Ok(Json(OrderProgress::for_order(&order)))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

pub fn router(state: AppState, cors_origin: &str, request_timeout: Duration) -> Router {
    Router::new()
        .route("/cart", get(get_cart).put(put_cart))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", get(get_order_status))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origin.parse::<header::HeaderValue>().unwrap())
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> Result<(), BoxError> {
    let app = router(
        state,
        &config.cors_origin,
        Duration::from_millis(config.request_timeout_ms),
    );

    tracing::info!("Starting ordering service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
