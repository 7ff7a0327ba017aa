//! One unresolved divergence per finding.
//! Re-running an audit must not file the same finding twice while the first
//! copy is still under review. NULL dates and sheet codes are folded so they
//! compare equal.
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEX: &str = "uniq_divergencia_aberta";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // expression + partial index; the index builder covers neither
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {INDEX} ON divergencias \
                 (tipo, numero_guia, carteirinha, \
                  COALESCE(data_execucao, DATE '0001-01-01'), COALESCE(codigo_ficha, '')) \
                 WHERE status <> 'resolvida'"
            ))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(INDEX).table(Divergencia::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Divergencia {
    #[sea_orm(iden = "divergencias")]
    Table,
}
