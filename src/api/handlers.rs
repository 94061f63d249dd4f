use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use rust_decimal::Decimal;

use crate::domain::{
    hash_credential, Holding, Order, PaymentMethod, Role, SettleOutcome, Stock, Transaction, User,
};
use crate::error::{BourseError, Result};

use super::state::{require_role, AppState};
use super::types::{
    AddPaymentMethodRequest, CreateStockRequest, DepositRequest, PlaceOrderRequest,
    RegisterRequest, SettleResponse, UpdateStockRequest, WithdrawRequest,
};

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Accounts
// ============================================================================

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(BourseError::Validation(
            "username and email are required".to_string(),
        ));
    }
    if req.password.is_empty() {
        return Err(BourseError::Validation("password is required".to_string()));
    }

    let role = match req.role.as_deref() {
        Some("admin") => {
            let authorized = matches!(
                (&state.admin_key, &req.admin_key),
                (Some(expected), Some(given)) if expected == given
            );
            if !authorized {
                return Err(BourseError::Forbidden { required: "admin" });
            }
            Role::Admin
        }
        _ => Role::Customer,
    };

    let credential_hash = hash_credential(&req.username, &req.password);
    let user = state
        .store
        .create_user(&req.username, &req.email, &credential_hash, role)
        .await?;
    Ok(Json(user))
}

// ============================================================================
// Catalog
// ============================================================================

pub async fn list_stocks(State(state): State<AppState>) -> Result<Json<Vec<Stock>>> {
    Ok(Json(state.store.list_stocks().await?))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Stock>> {
    Ok(Json(state.store.get_stock(id).await?))
}

pub async fn create_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateStockRequest>,
) -> Result<Json<Stock>> {
    let actor = state.principal(&headers).await?;
    require_role(&actor, Role::Admin)?;

    if req.price <= Decimal::ZERO {
        return Err(BourseError::Validation("price must be positive".to_string()));
    }
    if req.volume < Decimal::ZERO {
        return Err(BourseError::Validation(
            "volume must be non-negative".to_string(),
        ));
    }

    let stock = state
        .store
        .create_stock(&req.symbol, &req.name, req.price, req.volume)
        .await?;
    Ok(Json(stock))
}

pub async fn update_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStockRequest>,
) -> Result<Json<Stock>> {
    let actor = state.principal(&headers).await?;
    require_role(&actor, Role::Admin)?;

    if matches!(req.price, Some(p) if p <= Decimal::ZERO) {
        return Err(BourseError::Validation("price must be positive".to_string()));
    }
    if matches!(req.volume, Some(v) if v < Decimal::ZERO) {
        return Err(BourseError::Validation(
            "volume must be non-negative".to_string(),
        ));
    }

    let stock = state
        .store
        .update_stock(id, req.name.as_deref(), req.price, req.volume)
        .await?;
    Ok(Json(stock))
}

pub async fn delete_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let actor = state.principal(&headers).await?;
    require_role(&actor, Role::Admin)?;

    state.store.delete_stock(id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============================================================================
// Orders
// ============================================================================

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<Order>> {
    let actor = state.principal(&headers).await?;
    let order = state
        .orders
        .place(actor.id, req.stock_id, req.side, req.quantity)
        .await?;
    Ok(Json(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>> {
    let actor = state.principal(&headers).await?;
    Ok(Json(state.store.list_orders(actor.id).await?))
}

/// The order's owner (or an admin) may drive it to a terminal state.
async fn authorize_order_action(
    state: &AppState,
    headers: &HeaderMap,
    order_id: i64,
) -> Result<()> {
    let actor = state.principal(headers).await?;
    let order = state.store.get_order(order_id).await?;
    if order.user_id != actor.id && actor.role != Role::Admin {
        return Err(BourseError::Forbidden { required: "admin" });
    }
    Ok(())
}

pub async fn settle_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SettleResponse>> {
    authorize_order_action(&state, &headers, id).await?;
    let outcome: SettleOutcome = state.orders.settle(id).await?;
    Ok(Json(outcome.into()))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SettleResponse>> {
    authorize_order_action(&state, &headers, id).await?;
    let outcome: SettleOutcome = state.orders.cancel(id).await?;
    Ok(Json(outcome.into()))
}

// ============================================================================
// Funds
// ============================================================================

pub async fn deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> Result<Json<Transaction>> {
    let actor = state.principal(&headers).await?;
    let record = state
        .funds
        .deposit(actor.id, req.amount, req.payment_method_id)
        .await?;
    Ok(Json(record))
}

pub async fn withdraw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<Transaction>> {
    let actor = state.principal(&headers).await?;
    let record = state.funds.withdraw(actor.id, req.amount).await?;
    Ok(Json(record))
}

pub async fn list_holdings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Holding>>> {
    let actor = state.principal(&headers).await?;
    Ok(Json(state.store.list_holdings(actor.id).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>> {
    let actor = state.principal(&headers).await?;
    Ok(Json(state.store.list_transactions(actor.id).await?))
}

// ============================================================================
// Payment methods
// ============================================================================

pub async fn add_payment_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddPaymentMethodRequest>,
) -> Result<Json<PaymentMethod>> {
    let actor = state.principal(&headers).await?;

    if req.last4.len() != 4 || !req.last4.chars().all(|c| c.is_ascii_digit()) {
        return Err(BourseError::Validation(
            "last4 must be exactly four digits".to_string(),
        ));
    }
    if req.token.trim().is_empty() {
        return Err(BourseError::Validation("token is required".to_string()));
    }

    let method = state
        .store
        .add_payment_method(
            actor.id,
            req.brand,
            &req.last4,
            req.exp_month,
            req.exp_year,
            &req.token,
            req.make_default,
        )
        .await?;
    Ok(Json(method))
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PaymentMethod>>> {
    let actor = state.principal(&headers).await?;
    Ok(Json(state.store.list_payment_methods(actor.id).await?))
}

pub async fn set_default_payment_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let actor = state.principal(&headers).await?;
    state
        .store
        .set_default_payment_method(actor.id, id)
        .await?;
    Ok(Json(serde_json::json!({ "default": id })))
}

pub async fn remove_payment_method(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let actor = state.principal(&headers).await?;
    state.store.remove_payment_method(actor.id, id).await?;
    Ok(Json(serde_json::json!({ "removed": id })))
}
