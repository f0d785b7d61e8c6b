// src/middleware.rs

pub mod auth;
pub mod context;
pub mod i18n;
pub mod rbac;
pub mod tenancy;
