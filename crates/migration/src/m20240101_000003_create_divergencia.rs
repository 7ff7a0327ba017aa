//! Create `divergencias` table.
//! Reconciliation findings between execution records and attendance sheets.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Divergencia::Table)
                    .if_not_exists()
                    .col(uuid(Divergencia::Id).primary_key())
                    .col(uuid_null(Divergencia::GuiaId))
                    .col(string_len(Divergencia::NumeroGuia, 64).not_null())
                    .col(date_null(Divergencia::DataExecucao))
                    .col(date_null(Divergencia::DataAtendimento))
                    .col(date(Divergencia::DataIdentificacao).not_null())
                    .col(date_null(Divergencia::DataRegistro))
                    .col(string_len_null(Divergencia::CodigoFicha, 64))
                    .col(string_len(Divergencia::PacienteNome, 256).not_null())
                    .col(string_len(Divergencia::Carteirinha, 64).not_null())
                    .col(string_len(Divergencia::Status, 16).not_null())
                    .col(string_len(Divergencia::Tipo, 32).not_null())
                    .col(text(Divergencia::Descricao).not_null())
                    .col(boolean(Divergencia::PossuiAssinatura).not_null())
                    .col(string_len_null(Divergencia::ArquivoDigitalizado, 512))
                    .col(string_len_null(Divergencia::ResolvidoPor, 256))
                    .col(timestamp_with_time_zone_null(Divergencia::DataResolucao))
                    .col(integer_null(Divergencia::SessoesAutorizadas))
                    .col(integer_null(Divergencia::SessoesExecutadas))
                    .col(timestamp_with_time_zone(Divergencia::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Divergencia::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_divergencia_guia")
                            .from(Divergencia::Table, Divergencia::GuiaId)
                            .to(Guia::Table, Guia::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Divergencia::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Divergencia {
    #[sea_orm(iden = "divergencias")]
    Table,
    Id,
    GuiaId,
    NumeroGuia,
    DataExecucao,
    DataAtendimento,
    DataIdentificacao,
    DataRegistro,
    CodigoFicha,
    PacienteNome,
    Carteirinha,
    Status,
    Tipo,
    Descricao,
    PossuiAssinatura,
    ArquivoDigitalizado,
    ResolvidoPor,
    DataResolucao,
    SessoesAutorizadas,
    SessoesExecutadas,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Guia {
    #[sea_orm(iden = "guias_unimed")]
    Table,
    Id,
}
