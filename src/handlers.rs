// src/handlers.rs

pub mod audit;
pub mod catalog;
pub mod crm;
pub mod orders;
pub mod payments;
pub mod quotes;
pub mod schedule;
