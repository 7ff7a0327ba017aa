//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_carteirinha;
mod m20240101_000002_create_guia;
mod m20240101_000003_create_divergencia;
mod m20240101_000004_add_indexes;
mod m20240101_000005_unique_open_divergencia;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_carteirinha::Migration),
            Box::new(m20240101_000002_create_guia::Migration),
            // divergencias references guias_unimed
            Box::new(m20240101_000003_create_divergencia::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000004_add_indexes::Migration),
            Box::new(m20240101_000005_unique_open_divergencia::Migration),
        ]
    }
}
