//! Reconciliation of insurer executions against attendance sheets.

pub mod reconcile;
pub mod service;
