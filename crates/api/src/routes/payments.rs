//! Payment settlement endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{Money, PaymentId};
use domain::ConfirmPayment;
use serde::Deserialize;
use store::Store;

use super::{AppState, CurrentUser, OrderResponse, parse_id};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub amount_cents: i64,
    pub name: String,
}

/// POST /payments/{id}/confirm: settle the caller's order that owns this
/// payment. Another user's payment answers `NotFound`.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let payment_id: PaymentId = parse_id("payment id", &id)?;

    let order = state
        .order_service
        .confirm_payment(ConfirmPayment::new(
            user_id,
            payment_id,
            Money::from_cents(req.amount_cents),
            req.name,
        ))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}
