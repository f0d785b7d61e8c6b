// src/services/crm_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, CrmRepository},
    models::{
        auth::RequestContext,
        catalog::{CatalogService, CatalogServicePayload},
        crm::{Customer, CustomerPayload, Vehicle, VehiclePayload},
        orders::LineItem,
    },
    services::audit_service::AuditService,
};

/// Congela os serviços escolhidos em itens da OS/orçamento.
///
/// Itens que já existiam (mesmo `service_id`) mantêm o preço capturado;
/// só os novos são copiados do catálogo.
pub async fn snapshot_items(
    catalog: &dyn CatalogRepository,
    unit_id: Uuid,
    service_ids: &[Uuid],
    existing: &[LineItem],
) -> Result<Vec<LineItem>, AppError> {
    let mut available: Vec<Option<&LineItem>> = existing.iter().map(Some).collect();
    let mut items = Vec::with_capacity(service_ids.len());

    for service_id in service_ids {
        let kept = available
            .iter_mut()
            .find_map(|slot| slot.take_if(|item| item.service_id == *service_id));

        match kept {
            Some(item) => items.push(item.clone()),
            None => {
                let service = catalog
                    .get(unit_id, *service_id)
                    .await?
                    .ok_or(AppError::NotFound("service_not_found"))?;
                items.push(service.snapshot());
            }
        }
    }

    Ok(items)
}

#[derive(Clone)]
pub struct CrmService {
    crm: Arc<dyn CrmRepository>,
    catalog: Arc<dyn CatalogRepository>,
    audit: AuditService,
}

impl CrmService {
    pub fn new(crm: Arc<dyn CrmRepository>, catalog: Arc<dyn CatalogRepository>, audit: AuditService) -> Self {
        Self { crm, catalog, audit }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn list_customers(&self, ctx: &RequestContext) -> Result<Vec<Customer>, AppError> {
        self.crm.list_customers(ctx.unit_id).await
    }

    pub async fn get_customer(&self, ctx: &RequestContext, id: Uuid) -> Result<Customer, AppError> {
        self.crm
            .get_customer(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("customer_not_found"))
    }

    pub async fn create_customer(&self, ctx: &RequestContext, payload: CustomerPayload) -> Result<Customer, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            name: payload.name,
            phone: payload.phone,
            email: payload.email,
            document: payload.document,
            created_at: now,
            updated_at: now,
        };
        self.crm.insert_customer(&customer).await?;

        self.audit.record_change(ctx, "customers", customer.id, None, Some(&customer)).await;
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        payload: CustomerPayload,
    ) -> Result<Customer, AppError> {
        payload.validate()?;
        let current = self.get_customer(ctx, id).await?;

        let updated = Customer {
            name: payload.name,
            phone: payload.phone,
            email: payload.email,
            document: payload.document,
            updated_at: Utc::now(),
            ..current.clone()
        };
        if !self.crm.update_customer(&updated).await? {
            return Err(AppError::NotFound("customer_not_found"));
        }

        self.audit.record_change(ctx, "customers", id, Some(&current), Some(&updated)).await;
        Ok(updated)
    }

    /// Bloqueado enquanto o cliente tiver veículos.
    pub async fn delete_customer(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        let current = self.get_customer(ctx, id).await?;

        if self.crm.count_vehicles(ctx.unit_id, id).await? > 0 {
            return Err(AppError::CustomerHasVehicles);
        }
        if !self.crm.delete_customer(ctx.unit_id, id).await? {
            return Err(AppError::NotFound("customer_not_found"));
        }

        self.audit.record_change(ctx, "customers", id, Some(&current), None).await;
        Ok(())
    }

    // =========================================================================
    //  VEÍCULOS
    // =========================================================================

    pub async fn list_vehicles(&self, ctx: &RequestContext, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        self.get_customer(ctx, customer_id).await?;
        self.crm.list_vehicles(ctx.unit_id, customer_id).await
    }

    pub async fn create_vehicle(
        &self,
        ctx: &RequestContext,
        customer_id: Uuid,
        payload: VehiclePayload,
    ) -> Result<Vehicle, AppError> {
        payload.validate()?;
        self.get_customer(ctx, customer_id).await?;

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            customer_id,
            plate: payload.plate.trim().to_uppercase(),
            make: payload.make,
            model: payload.model,
            year: payload.year,
            created_at: Utc::now(),
        };
        self.crm.insert_vehicle(&vehicle).await?;

        self.audit.record_change(ctx, "vehicles", vehicle.id, None, Some(&vehicle)).await;
        Ok(vehicle)
    }

    pub async fn delete_vehicle(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        let current = self
            .crm
            .get_vehicle(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("vehicle_not_found"))?;

        if !self.crm.delete_vehicle(ctx.unit_id, id).await? {
            return Err(AppError::NotFound("vehicle_not_found"));
        }

        self.audit.record_change(ctx, "vehicles", id, Some(&current), None).await;
        Ok(())
    }

    // =========================================================================
    //  CATÁLOGO DE SERVIÇOS
    // =========================================================================

    pub async fn list_services(&self, ctx: &RequestContext) -> Result<Vec<CatalogService>, AppError> {
        self.catalog.list(ctx.unit_id).await
    }

    pub async fn create_service(
        &self,
        ctx: &RequestContext,
        payload: CatalogServicePayload,
    ) -> Result<CatalogService, AppError> {
        payload.validate()?;
        if payload.price < Decimal::ZERO {
            return Err(AppError::InvalidInput("price_negative"));
        }

        let now = Utc::now();
        let service = CatalogService {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            name: payload.name,
            price: payload.price,
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        };
        self.catalog.insert(&service).await?;

        self.audit.record_change(ctx, "services", service.id, None, Some(&service)).await;
        Ok(service)
    }

    /// Mudar o preço aqui não mexe em OS existentes.
    pub async fn update_service(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        payload: CatalogServicePayload,
    ) -> Result<CatalogService, AppError> {
        payload.validate()?;
        if payload.price < Decimal::ZERO {
            return Err(AppError::InvalidInput("price_negative"));
        }

        let current = self
            .catalog
            .get(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("service_not_found"))?;

        let updated = CatalogService {
            name: payload.name,
            price: payload.price,
            is_active: payload.is_active,
            updated_at: Utc::now(),
            ..current.clone()
        };
        if !self.catalog.update(&updated).await? {
            return Err(AppError::NotFound("service_not_found"));
        }

        self.audit.record_change(ctx, "services", id, Some(&current), Some(&updated)).await;
        Ok(updated)
    }

    pub async fn delete_service(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        let current = self
            .catalog
            .get(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("service_not_found"))?;

        if !self.catalog.delete(ctx.unit_id, id).await? {
            return Err(AppError::NotFound("service_not_found"));
        }

        self.audit.record_change(ctx, "services", id, Some(&current), None).await;
        Ok(())
    }
}
