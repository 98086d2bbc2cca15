//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{OrderService, OrderState};
use serde::Serialize;
use store::{Order, OrderItem, Payment, Store};

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
}

/// The authenticated caller, read from the `x-user-id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<St: Send + Sync> FromRequestParts<St> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {USER_ID_HEADER} header")))?;
        let value = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;
        let user_id = UserId::from_str(value.trim())
            .map_err(|e| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header: {e}")))?;
        Ok(CurrentUser(user_id))
    }
}

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T>(name: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    T::from_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {name}: {e}")))
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub state: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub payment: PaymentResponse,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub price_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub name: String,
    pub amount_cents: i64,
    pub status: String,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            price_cents: item.price.cents(),
        }
    }
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            name: payment.name.clone(),
            amount_cents: payment.amount.cents(),
            status: payment.status.to_string(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            state: OrderState::of(order).to_string(),
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            total_cents: order.total.cents(),
            payment: PaymentResponse::from(&order.payment),
            created_at: order.created_at,
        }
    }
}
