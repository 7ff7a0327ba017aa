//! Stored reconciliation findings and their review workflow.

pub mod domain;
pub mod repository;
pub mod service;
