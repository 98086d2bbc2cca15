//! Cart endpoints: line item mutations and order reads.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderItemId, ProductId};
use domain::{AddItem, RemoveItem, UpdateItem};
use serde::Deserialize;
use store::Store;

use super::{AppState, CurrentUser, OrderResponse, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Handlers --

/// POST /orders/items: add a product to the caller's open order.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let product_id: ProductId = parse_id("product_id", &req.product_id)?;

    let order = state
        .order_service
        .add_item(AddItem::new(user_id, product_id, req.quantity))
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// PATCH /orders/items/{item_id}: change a line item's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let item_id: OrderItemId = parse_id("item_id", &item_id)?;

    let order = state
        .order_service
        .update_item(UpdateItem::new(user_id, item_id, req.quantity))
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /orders/items/{item_id}: remove a line item.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let item_id: OrderItemId = parse_id("item_id", &item_id)?;

    let order = state
        .order_service
        .remove_item(RemoveItem::new(user_id, item_id))
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/current: the caller's open order.
#[tracing::instrument(skip(state))]
pub async fn current<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.current_order(user_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/history: the caller's paid orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.order_history(user_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: load one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order id", &id)?;
    let order = state.order_service.get_order(order_id).await?;

    // Other users' orders are reported as missing.
    if order.user_id != user_id {
        return Err(ApiError::Order(domain::OrderError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        }));
    }

    Ok(Json(OrderResponse::from(&order)))
}
