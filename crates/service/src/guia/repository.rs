use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Value,
};
use uuid::Uuid;

use models::guia::{self, GuiaStatus};

use crate::errors::ServiceError;
use crate::guia::domain::GuiaFiltro;
use crate::pagination::PageRequest;

#[async_trait]
pub trait GuiaRepository: Send + Sync {
    /// Matching rows for the window plus the total match count.
    async fn list(&self, filtro: &GuiaFiltro, page: PageRequest) -> Result<(Vec<guia::Model>, u64), ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<guia::Model>, ServiceError>;
    /// Most recent guide for a number on a given card.
    async fn find_by_numero(&self, numero_guia: &str, carteirinha: &str) -> Result<Option<guia::Model>, ServiceError>;
    /// Compare-and-set on `status`: writes only while the row is still in
    /// `expected`. Returns `None` when no such row exists.
    async fn update_status(
        &self,
        id: Uuid,
        expected: GuiaStatus,
        status: GuiaStatus,
        data_execucao: Option<NaiveDate>,
    ) -> Result<Option<guia::Model>, ServiceError>;
}

/// SeaORM-backed repository implementation.
pub struct SeaOrmGuiaRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl GuiaRepository for SeaOrmGuiaRepository {
    async fn list(&self, filtro: &GuiaFiltro, page: PageRequest) -> Result<(Vec<guia::Model>, u64), ServiceError> {
        let cond = filtro.condition();
        // dedicated COUNT so the match set is never materialized for the total
        let total = guia::Entity::find()
            .filter(cond.clone())
            .count(&self.db)
            .await
            .map_err(ServiceError::db)?;
        let rows = guia::Entity::find()
            .filter(cond)
            .order_by_desc(guia::Column::CreatedAt)
            .order_by_desc(guia::Column::Id)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await
            .map_err(ServiceError::db)?;
        Ok((rows, total))
    }

    async fn get(&self, id: Uuid) -> Result<Option<guia::Model>, ServiceError> {
        guia::Entity::find_by_id(id).one(&self.db).await.map_err(ServiceError::db)
    }

    async fn find_by_numero(&self, numero_guia: &str, carteirinha: &str) -> Result<Option<guia::Model>, ServiceError> {
        guia::Entity::find()
            .filter(guia::Column::NumeroGuia.eq(numero_guia))
            .filter(guia::Column::PacienteCarteirinha.eq(carteirinha))
            .order_by_desc(guia::Column::DataAtendimento)
            .one(&self.db)
            .await
            .map_err(ServiceError::db)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: GuiaStatus,
        status: GuiaStatus,
        data_execucao: Option<NaiveDate>,
    ) -> Result<Option<guia::Model>, ServiceError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut upd = guia::Entity::update_many()
            .col_expr(guia::Column::Status, Expr::value(Value::from(status.into_value())))
            .col_expr(guia::Column::UpdatedAt, Expr::value(Value::from(now)))
            .filter(guia::Column::Id.eq(id))
            .filter(guia::Column::Status.eq(expected));
        if let Some(d) = data_execucao {
            upd = upd.col_expr(guia::Column::DataExecucao, Expr::value(Value::from(d)));
        }
        let res = upd.exec(&self.db).await.map_err(ServiceError::db)?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}

/// In-memory repository for tests and doc examples.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGuiaRepository {
        rows: Mutex<Vec<guia::Model>>,
        failing: bool,
    }

    impl MockGuiaRepository {
        pub fn with_rows(rows: Vec<guia::Model>) -> Self {
            Self { rows: Mutex::new(rows), failing: false }
        }

        /// Every call fails as if the store were unreachable.
        pub fn failing() -> Self {
            Self { rows: Mutex::new(Vec::new()), failing: true }
        }

        pub fn snapshot(&self) -> Vec<guia::Model> {
            self.rows.lock().unwrap().clone()
        }

        fn check(&self) -> Result<(), ServiceError> {
            if self.failing {
                return Err(ServiceError::Db("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GuiaRepository for MockGuiaRepository {
        async fn list(&self, filtro: &GuiaFiltro, page: PageRequest) -> Result<(Vec<guia::Model>, u64), ServiceError> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            let mut matched: Vec<guia::Model> = rows.iter().filter(|g| filtro.matches(g)).cloned().collect();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
            let total = matched.len() as u64;
            let window = matched
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
            Ok((window, total))
        }

        async fn get(&self, id: Uuid) -> Result<Option<guia::Model>, ServiceError> {
            self.check()?;
            Ok(self.rows.lock().unwrap().iter().find(|g| g.id == id).cloned())
        }

        async fn find_by_numero(&self, numero_guia: &str, carteirinha: &str) -> Result<Option<guia::Model>, ServiceError> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|g| g.numero_guia == numero_guia && g.paciente_carteirinha == carteirinha)
                .max_by_key(|g| g.data_atendimento)
                .cloned())
        }

        async fn update_status(
            &self,
            id: Uuid,
            expected: GuiaStatus,
            status: GuiaStatus,
            data_execucao: Option<NaiveDate>,
        ) -> Result<Option<guia::Model>, ServiceError> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|g| g.id == id && g.status == expected) else { return Ok(None); };
            row.status = status;
            if let Some(d) = data_execucao { row.data_execucao = Some(d); }
            row.updated_at = Utc::now().into();
            Ok(Some(row.clone()))
        }
    }
}
