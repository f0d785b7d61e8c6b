// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

/// Monta o router completo da API.
pub fn app(app_state: AppState) -> Router {
    // Rotas de OS, pagamentos e calendário
    let order_routes = Router::new()
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/api/orders/mine", get(handlers::orders::list_my_orders))
        .route("/api/orders/kanban", post(handlers::orders::reorder_kanban))
        .route(
            "/api/orders/{id}",
            get(handlers::orders::get_order)
                .patch(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/api/orders/{id}/status", post(handlers::orders::set_status))
        .route("/api/orders/{id}/advance", post(handlers::orders::advance_order))
        .route("/api/orders/{id}/assignee", put(handlers::orders::assign_order))
        .route(
            "/api/orders/{id}/payments",
            get(handlers::payments::payment_summary).post(handlers::payments::add_payment),
        )
        .route(
            "/api/orders/{id}/payments/{payment_id}",
            delete(handlers::payments::delete_payment),
        )
        .route("/api/schedule", get(handlers::schedule::calendar))
        .route("/api/schedule/conflicts", post(handlers::schedule::check_conflict))
        .route("/api/schedule/events", post(handlers::schedule::create_event))
        .route("/api/schedule/events/{id}", patch(handlers::schedule::move_event))
        .route("/api/schedule/stream", get(handlers::schedule::schedule_stream));

    // Cadastros, catálogo, orçamentos e auditoria
    let registry_routes = Router::new()
        .route(
            "/api/customers",
            get(handlers::crm::list_customers).post(handlers::crm::create_customer),
        )
        .route(
            "/api/customers/{id}",
            get(handlers::crm::get_customer)
                .put(handlers::crm::update_customer)
                .delete(handlers::crm::delete_customer),
        )
        .route(
            "/api/customers/{id}/vehicles",
            get(handlers::crm::list_vehicles).post(handlers::crm::create_vehicle),
        )
        .route("/api/vehicles/{id}", delete(handlers::crm::delete_vehicle))
        .route(
            "/api/services",
            get(handlers::catalog::list_services).post(handlers::catalog::create_service),
        )
        .route(
            "/api/services/{id}",
            put(handlers::catalog::update_service).delete(handlers::catalog::delete_service),
        )
        .route(
            "/api/quotes",
            get(handlers::quotes::list_quotes).post(handlers::quotes::create_quote),
        )
        .route(
            "/api/quotes/{id}",
            get(handlers::quotes::get_quote)
                .put(handlers::quotes::update_quote)
                .delete(handlers::quotes::delete_quote),
        )
        .route("/api/quotes/{id}/publish", post(handlers::quotes::publish_quote))
        .route("/api/quotes/{id}/convert", post(handlers::quotes::convert_quote))
        .route("/api/audit", get(handlers::audit::audit_history));

    // Aplica o middleware de Auth em tudo que não é público
    let protected_routes = order_routes
        .merge(registry_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Link público do orçamento (sem token)
    let public_routes = Router::new()
        .route("/api/public/quotes/{token}", get(handlers::quotes::get_public_quote))
        .route("/acceptQuote", post(handlers::quotes::accept_quote))
        .route("/rejectQuote", post(handlers::quotes::reject_quote));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
