use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Accounts
        .route("/api/register", post(handlers::register))
        // Catalog
        .route(
            "/api/stocks",
            get(handlers::list_stocks).post(handlers::create_stock),
        )
        .route(
            "/api/stocks/:id",
            get(handlers::get_stock)
                .put(handlers::update_stock)
                .delete(handlers::delete_stock),
        )
        // Orders
        .route(
            "/api/orders",
            get(handlers::list_orders).post(handlers::place_order),
        )
        .route("/api/orders/:id/settle", post(handlers::settle_order))
        .route("/api/orders/:id/cancel", post(handlers::cancel_order))
        // Portfolio
        .route("/api/holdings", get(handlers::list_holdings))
        // Funds
        .route("/api/funds/deposit", post(handlers::deposit))
        .route("/api/funds/withdraw", post(handlers::withdraw))
        .route("/api/transactions", get(handlers::list_transactions))
        // Payment methods
        .route(
            "/api/payment-methods",
            get(handlers::list_payment_methods).post(handlers::add_payment_method),
        )
        .route(
            "/api/payment-methods/:id/default",
            post(handlers::set_default_payment_method),
        )
        .route(
            "/api/payment-methods/:id",
            delete(handlers::remove_payment_method),
        )
        .with_state(state)
        .layer(cors)
}
