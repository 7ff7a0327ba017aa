//! Create `carteirinhas` table.
//! Health-plan membership cards, one row per card number.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Carteirinha::Table)
                    .if_not_exists()
                    .col(uuid(Carteirinha::Id).primary_key())
                    .col(string_len(Carteirinha::Numero, 64).not_null().unique_key())
                    .col(uuid(Carteirinha::PacienteId).not_null())
                    .col(uuid_null(Carteirinha::PlanoSaudeId))
                    .col(date_null(Carteirinha::DataValidade))
                    .col(string_len(Carteirinha::Status, 16).not_null())
                    .col(boolean(Carteirinha::Titular).not_null())
                    .col(timestamp_with_time_zone(Carteirinha::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Carteirinha::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Carteirinha::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Carteirinha {
    #[sea_orm(iden = "carteirinhas")]
    Table,
    Id,
    Numero,
    PacienteId,
    PlanoSaudeId,
    DataValidade,
    Status,
    Titular,
    CreatedAt,
    UpdatedAt,
}
