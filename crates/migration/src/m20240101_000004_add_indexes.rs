use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Guides: listing sorts by creation time and filters by status / card
        manager
            .create_index(
                Index::create()
                    .name("idx_guia_created_at")
                    .table(Guia::Table)
                    .col(Guia::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_guia_status")
                    .table(Guia::Table)
                    .col(Guia::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_guia_carteirinha")
                    .table(Guia::Table)
                    .col(Guia::PacienteCarteirinha)
                    .to_owned(),
            )
            .await?;

        // Divergences: dashboard filters
        manager
            .create_index(
                Index::create()
                    .name("idx_divergencia_status_tipo")
                    .table(Divergencia::Table)
                    .col(Divergencia::Status)
                    .col(Divergencia::Tipo)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_divergencia_identificacao")
                    .table(Divergencia::Table)
                    .col(Divergencia::DataIdentificacao)
                    .to_owned(),
            )
            .await?;

        // Cards: lookup by patient
        manager
            .create_index(
                Index::create()
                    .name("idx_carteirinha_paciente")
                    .table(Carteirinha::Table)
                    .col(Carteirinha::PacienteId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_guia_created_at").table(Guia::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_guia_status").table(Guia::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_guia_carteirinha").table(Guia::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_divergencia_status_tipo").table(Divergencia::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_divergencia_identificacao").table(Divergencia::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_carteirinha_paciente").table(Carteirinha::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Guia {
    #[sea_orm(iden = "guias_unimed")]
    Table,
    CreatedAt,
    Status,
    PacienteCarteirinha,
}

#[derive(DeriveIden)]
enum Divergencia {
    #[sea_orm(iden = "divergencias")]
    Table,
    Status,
    Tipo,
    DataIdentificacao,
}

#[derive(DeriveIden)]
enum Carteirinha {
    #[sea_orm(iden = "carteirinhas")]
    Table,
    PacienteId,
}
