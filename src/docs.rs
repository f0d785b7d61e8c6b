// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- ORDERS ---
        handlers::orders::list_orders,
        handlers::orders::list_my_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::set_status,
        handlers::orders::advance_order,
        handlers::orders::assign_order,
        handlers::orders::reorder_kanban,

        // --- PAYMENTS ---
        handlers::payments::payment_summary,
        handlers::payments::add_payment,
        handlers::payments::delete_payment,

        // --- SCHEDULE ---
        handlers::schedule::calendar,
        handlers::schedule::check_conflict,
        handlers::schedule::create_event,
        handlers::schedule::move_event,
        handlers::schedule::schedule_stream,

        // --- CRM ---
        handlers::crm::list_customers,
        handlers::crm::create_customer,
        handlers::crm::get_customer,
        handlers::crm::update_customer,
        handlers::crm::delete_customer,
        handlers::crm::list_vehicles,
        handlers::crm::create_vehicle,
        handlers::crm::delete_vehicle,

        // --- CATALOG ---
        handlers::catalog::list_services,
        handlers::catalog::create_service,
        handlers::catalog::update_service,
        handlers::catalog::delete_service,

        // --- QUOTES ---
        handlers::quotes::list_quotes,
        handlers::quotes::create_quote,
        handlers::quotes::get_quote,
        handlers::quotes::update_quote,
        handlers::quotes::delete_quote,
        handlers::quotes::publish_quote,
        handlers::quotes::convert_quote,
        handlers::quotes::get_public_quote,
        handlers::quotes::accept_quote,
        handlers::quotes::reject_quote,

        // --- AUDIT ---
        handlers::audit::audit_history,
    ),
    components(
        schemas(
            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::LineItem,
            models::orders::ScheduleWindow,
            models::orders::ServiceOrder,
            models::orders::CreateOrderPayload,
            models::orders::OrderPatch,
            models::orders::KanbanUpdate,
            models::orders::KanbanPayload,
            models::orders::SetStatusPayload,
            models::orders::AssignPayload,

            // --- Payments ---
            models::payments::PaymentMethod,
            models::payments::Payment,
            models::payments::AddPaymentPayload,
            models::payments::PaymentSummary,

            // --- Schedule ---
            models::schedule::ConflictCheckPayload,
            models::schedule::ConflictCheckResponse,
            models::schedule::MoveEventPayload,
            models::schedule::ScheduleChangeKind,
            models::schedule::ScheduleChanged,

            // --- CRM ---
            models::crm::Customer,
            models::crm::Vehicle,
            models::crm::CustomerPayload,
            models::crm::VehiclePayload,

            // --- Catalog ---
            models::catalog::CatalogService,
            models::catalog::CatalogServicePayload,

            // --- Quotes ---
            models::quotes::QuoteStatus,
            models::quotes::Quote,
            models::quotes::PublicQuote,
            models::quotes::QuotePayload,
            models::quotes::PublishedQuote,

            // --- Audit ---
            models::audit::AuditAction,
            models::audit::FieldChange,
            models::audit::AuditLog,

            // --- Auth ---
            models::auth::Role,
            models::auth::Identity,
        )
    ),
    tags(
        (name = "Orders", description = "Ordens de Serviço e Kanban"),
        (name = "Payments", description = "Pagamentos e Saldo da OS"),
        (name = "Schedule", description = "Calendário e Conflitos de Agenda"),
        (name = "CRM", description = "Clientes e Veículos"),
        (name = "Catalog", description = "Catálogo de Serviços"),
        (name = "Quotes", description = "Orçamentos"),
        (name = "Public", description = "Link Público de Orçamento"),
        (name = "Audit", description = "Trilha de Auditoria")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
