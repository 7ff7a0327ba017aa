//! Service layer for the clinic back-end.
//! - Repository traits at the persistence seam, with SeaORM and in-memory implementations.
//! - Input parsing and workflow rules live here; `models` only describes rows.

pub mod errors;
pub mod input;
pub mod pagination;
pub mod guia;
pub mod divergencia;
pub mod carteirinha;
pub mod auditoria;
