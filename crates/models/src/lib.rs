//! SeaORM entities for the clinic back-office, plus the status workflows
//! attached to them.

pub mod errors;
pub mod db;
pub mod limits;
pub mod guia;
pub mod divergencia;
pub mod carteirinha;
