//! Marketplace API handlers.
//!
//! # Endpoints
//!
//! - `POST /marketplace/orders`               – create an order
//! - `GET  /marketplace/orders`               – list live orders
//! - `POST /marketplace/orders/cancellations` – request cancellation
//! - `GET  /marketplace/sales`                – list settled trades
//! - `GET  /marketplace/nonce/{chain_id}/{participant}` – nonce watermark
//! - `POST /webhook/events`                   – chain event delivery

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tbmkt_core::entities::order::{Order, OrderWithPosition};
use tbmkt_core::entities::sale::Sale;
use tbmkt_core::marketplace::{MarketplaceError, RejectionReason};
use tbmkt_core::utils::to_unix_seconds;
use tbmkt_sdk::objects::{OrderRejection, OrderResponse, SaleResponse};

use crate::state::AppState;

mod cancel_order;
mod create_order;
mod list_orders;
mod list_sales;
mod nonce;
mod webhook;

/// Build the marketplace API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/marketplace/orders",
            post(create_order::create_order).get(list_orders::list_orders),
        )
        .route(
            "/marketplace/orders/cancellations",
            post(cancel_order::cancel_order),
        )
        .route("/marketplace/sales", get(list_sales::list_sales))
        .route(
            "/marketplace/nonce/{chain_id}/{participant}",
            get(nonce::get_nonce),
        )
        .route("/webhook/events", post(webhook::receive_chain_event))
}

/// Convert an `Order` (DB model) into an `OrderResponse` (API model).
fn to_response(order: Order) -> OrderResponse {
    OrderResponse {
        id: order.id,
        kind: order.order_type.into(),
        collection: order.collection,
        currency: order.currency,
        participant: order.participant,
        chain_id: order.chain_id,
        token_id: order.token_id,
        amount: order.amount,
        expiry: to_unix_seconds(order.expiry),
        nonce: order.nonce,
        status: order.status.into(),
        is_stale: order.is_stale,
        created_at: to_unix_seconds(order.created_at),
        wallet_address: None,
        owner_address: None,
    }
}

/// Convert a joined row into an `OrderResponse` carrying the position.
fn to_joined_response(row: OrderWithPosition) -> OrderResponse {
    let mut response = to_response(row.order);
    response.wallet_address = Some(row.wallet_address);
    response.owner_address = Some(row.owner_address);
    response
}

/// Convert a `Sale` (DB model) into a `SaleResponse` (API model).
fn to_sale_response(sale: Sale) -> SaleResponse {
    SaleResponse {
        id: sale.id,
        chain_id: sale.chain_id,
        collection: sale.collection,
        currency: sale.currency,
        buyer: sale.buyer_address,
        seller: sale.seller_address,
        token_id: sale.token_id,
        amount: sale.amount,
        sale_date: to_unix_seconds(sale.sale_date),
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in marketplace API handlers.
#[derive(Debug)]
enum ApiError {
    /// The order was refused by validation.
    Rejected(RejectionReason),
    /// A malformed field the deserializer cannot catch.
    BadRequest(&'static str),
    /// A database query failed.
    Database(sqlx::Error),
    /// The event pipeline is unavailable.
    IngestUnavailable,
}

impl From<MarketplaceError> for ApiError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::Rejected(reason) => ApiError::Rejected(reason),
            MarketplaceError::Database(e) => ApiError::Database(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            // Rejection codes double as HTTP status codes, including
            // the non-standard 42x range.
            ApiError::Rejected(reason) => {
                let code = reason.code();
                let status =
                    StatusCode::from_u16(code).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
                (
                    status,
                    Json(OrderRejection {
                        code,
                        message: reason.to_string(),
                    }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ApiError::Database(e) => {
                tracing::error!(error = %e, "Marketplace API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ApiError::IngestUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "event pipeline unavailable").into_response()
            }
        }
    }
}
