//! Cart and order endpoints, keyed by an opaque session id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::models::{CartItem, CartSnapshot, Order, UpdateQuantityRequest};
use crate::AppState;

/// GET /api/carts/{session} - Cart contents and total.
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Json<CartSnapshot> {
    Json(state.carts.read(&session, |cart| cart.snapshot()).await)
}

/// POST /api/carts/{session}/items - Add a line item.
pub async fn add_item(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Json(item): Json<CartItem>,
) -> Result<Json<CartSnapshot>, AppError> {
    if item.id.trim().is_empty() {
        return Err(AppError::Validation("Item id is required".to_string()));
    }
    if item.quantity == 0 {
        return Err(AppError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(AppError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }

    state
        .carts
        .update(&session, |cart| cart.add(item).then(|| cart.snapshot()))
        .await
        .map(Json)
        .ok_or_else(|| AppError::Validation("Quantity is too large".to_string()))
}

/// PUT /api/carts/{session}/items/{id} - Change a line item's quantity.
pub async fn update_item(
    State(state): State<AppState>,
    Path((session, id)): Path<(String, String)>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartSnapshot>, AppError> {
    if request.quantity == 0 {
        return Err(AppError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }

    state
        .carts
        .update(&session, |cart| {
            cart.update_quantity(&id, request.quantity)
                .then(|| cart.snapshot())
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {} not in cart", id)))
}

/// DELETE /api/carts/{session}/items/{id} - Remove a line item.
pub async fn remove_item(
    State(state): State<AppState>,
    Path((session, id)): Path<(String, String)>,
) -> Result<Json<CartSnapshot>, AppError> {
    state
        .carts
        .update(&session, |cart| cart.remove(&id).then(|| cart.snapshot()))
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {} not in cart", id)))
}

/// DELETE /api/carts/{session} - Empty the cart.
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Json<CartSnapshot> {
    let snapshot = state
        .carts
        .update(&session, |cart| {
            cart.clear();
            cart.snapshot()
        })
        .await;
    Json(snapshot)
}

/// POST /api/carts/{session}/checkout - Turn the cart into a pending order.
pub async fn checkout(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state
        .carts
        .update(&session, |cart| cart.checkout())
        .await
        .ok_or_else(|| AppError::Validation("Cart is empty".to_string()))?;

    tracing::info!(order_id = %order.id, total = order.total, "Order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/carts/{session}/orders - Order history, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Json<Vec<Order>> {
    Json(state.carts.read(&session, |cart| cart.orders().to_vec()).await)
}
