//! Guide listing and status workflow.

pub mod domain;
pub mod repository;
pub mod service;
