//! Create `guias_unimed` table.
//! Insurer guides imported by the ingestion pipeline; only `status`,
//! `data_execucao` and `updated_at` change afterwards.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Guia::Table)
                    .if_not_exists()
                    .col(uuid(Guia::Id).primary_key())
                    .col(string_len(Guia::NumeroGuia, 64).not_null())
                    .col(string_len(Guia::PacienteNome, 256).not_null())
                    .col(string_len(Guia::PacienteCarteirinha, 64).not_null())
                    .col(date(Guia::DataAtendimento).not_null())
                    .col(date_null(Guia::DataExecucao))
                    .col(string_len(Guia::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Guia::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Guia::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        // One guide number per card and attendance day
        manager
            .create_index(
                Index::create()
                    .name("uniq_guia_numero_carteirinha_atendimento")
                    .table(Guia::Table)
                    .col(Guia::NumeroGuia)
                    .col(Guia::PacienteCarteirinha)
                    .col(Guia::DataAtendimento)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Guia::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Guia {
    #[sea_orm(iden = "guias_unimed")]
    Table,
    Id,
    NumeroGuia,
    PacienteNome,
    PacienteCarteirinha,
    DataAtendimento,
    DataExecucao,
    Status,
    CreatedAt,
    UpdatedAt,
}
