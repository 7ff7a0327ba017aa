use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionTrait, Value,
};
use uuid::Uuid;

use models::divergencia::{self, DivergenciaStatus, DivergenciaTipo, NewDivergencia};

use crate::divergencia::domain::DivergenciaFiltro;
use crate::errors::ServiceError;
use crate::pagination::PageRequest;

#[async_trait]
pub trait DivergenciaRepository: Send + Sync {
    async fn list(
        &self,
        filtro: &DivergenciaFiltro,
        page: PageRequest,
    ) -> Result<(Vec<divergencia::Model>, u64), ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<divergencia::Model>, ServiceError>;
    /// Unresolved divergences filed under any of these guide numbers.
    async fn open_for_guias(&self, numeros_guia: &[String]) -> Result<Vec<divergencia::Model>, ServiceError>;
    /// Writes the new status only while the row is still in `expected`;
    /// `None` when no such row exists. Resolver fields are only touched when `Some`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: DivergenciaStatus,
        status: DivergenciaStatus,
        resolvido_por: Option<String>,
        data_resolucao: Option<DateTimeWithTimeZone>,
    ) -> Result<Option<divergencia::Model>, ServiceError>;
    async fn count_by_status(&self) -> Result<Vec<(DivergenciaStatus, u64)>, ServiceError>;
    async fn count_by_tipo(&self) -> Result<Vec<(DivergenciaTipo, u64)>, ServiceError>;
    /// All-or-nothing insert of a batch of findings. A finding that is
    /// already open fails the whole batch with `Conflict`.
    async fn insert_many(&self, items: Vec<NewDivergencia>) -> Result<Vec<divergencia::Model>, ServiceError>;
}

fn map_write_err(e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict("an identical divergence is already open".into())
        }
        _ => ServiceError::db(e),
    }
}

pub struct SeaOrmDivergenciaRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl DivergenciaRepository for SeaOrmDivergenciaRepository {
    async fn list(
        &self,
        filtro: &DivergenciaFiltro,
        page: PageRequest,
    ) -> Result<(Vec<divergencia::Model>, u64), ServiceError> {
        let cond = filtro.condition();
        let total = divergencia::Entity::find()
            .filter(cond.clone())
            .count(&self.db)
            .await
            .map_err(ServiceError::db)?;
        let rows = divergencia::Entity::find()
            .filter(cond)
            .order_by_desc(divergencia::Column::CreatedAt)
            .order_by_desc(divergencia::Column::Id)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await
            .map_err(ServiceError::db)?;
        Ok((rows, total))
    }

    async fn get(&self, id: Uuid) -> Result<Option<divergencia::Model>, ServiceError> {
        divergencia::Entity::find_by_id(id).one(&self.db).await.map_err(ServiceError::db)
    }

    async fn open_for_guias(&self, numeros_guia: &[String]) -> Result<Vec<divergencia::Model>, ServiceError> {
        if numeros_guia.is_empty() {
            return Ok(Vec::new());
        }
        divergencia::Entity::find()
            .filter(divergencia::Column::NumeroGuia.is_in(numeros_guia.iter().cloned()))
            .filter(divergencia::Column::Status.ne(DivergenciaStatus::Resolvida))
            .all(&self.db)
            .await
            .map_err(ServiceError::db)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: DivergenciaStatus,
        status: DivergenciaStatus,
        resolvido_por: Option<String>,
        data_resolucao: Option<DateTimeWithTimeZone>,
    ) -> Result<Option<divergencia::Model>, ServiceError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut upd = divergencia::Entity::update_many()
            .col_expr(divergencia::Column::Status, Expr::value(Value::from(status.into_value())))
            .col_expr(divergencia::Column::UpdatedAt, Expr::value(Value::from(now)))
            .filter(divergencia::Column::Id.eq(id))
            .filter(divergencia::Column::Status.eq(expected));
        if let Some(r) = resolvido_por {
            upd = upd.col_expr(divergencia::Column::ResolvidoPor, Expr::value(Value::from(r)));
        }
        if let Some(d) = data_resolucao {
            upd = upd.col_expr(divergencia::Column::DataResolucao, Expr::value(Value::from(d)));
        }
        let res = upd.exec(&self.db).await.map_err(ServiceError::db)?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn count_by_status(&self) -> Result<Vec<(DivergenciaStatus, u64)>, ServiceError> {
        let rows: Vec<(DivergenciaStatus, i64)> = divergencia::Entity::find()
            .select_only()
            .column(divergencia::Column::Status)
            .column_as(Expr::col(divergencia::Column::Id).count(), "n")
            .group_by(divergencia::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(ServiceError::db)?;
        Ok(rows.into_iter().map(|(s, n)| (s, n.max(0) as u64)).collect())
    }

    async fn count_by_tipo(&self) -> Result<Vec<(DivergenciaTipo, u64)>, ServiceError> {
        let rows: Vec<(DivergenciaTipo, i64)> = divergencia::Entity::find()
            .select_only()
            .column(divergencia::Column::Tipo)
            .column_as(Expr::col(divergencia::Column::Id).count(), "n")
            .group_by(divergencia::Column::Tipo)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(ServiceError::db)?;
        Ok(rows.into_iter().map(|(t, n)| (t, n.max(0) as u64)).collect())
    }

    async fn insert_many(&self, items: Vec<NewDivergencia>) -> Result<Vec<divergencia::Model>, ServiceError> {
        let models = items
            .into_iter()
            .map(divergencia::new_model)
            .collect::<Result<Vec<_>, _>>()?;
        let txn = self.db.begin().await.map_err(ServiceError::db)?;
        let mut saved = Vec::with_capacity(models.len());
        for m in models {
            saved.push(divergencia::to_active_model(m).insert(&txn).await.map_err(map_write_err)?);
        }
        txn.commit().await.map_err(ServiceError::db)?;
        Ok(saved)
    }
}

pub mod mock {
    use super::*;
    use models::divergencia::ChaveDivergencia;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockDivergenciaRepository {
        rows: Mutex<Vec<divergencia::Model>>,
        failing: bool,
    }

    impl MockDivergenciaRepository {
        pub fn with_rows(rows: Vec<divergencia::Model>) -> Self {
            Self { rows: Mutex::new(rows), failing: false }
        }

        pub fn failing() -> Self {
            Self { rows: Mutex::new(Vec::new()), failing: true }
        }

        pub fn snapshot(&self) -> Vec<divergencia::Model> {
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
    impl DivergenciaRepository for MockDivergenciaRepository {
        async fn list(
            &self,
            filtro: &DivergenciaFiltro,
            page: PageRequest,
        ) -> Result<(Vec<divergencia::Model>, u64), ServiceError> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            let mut matched: Vec<_> = rows.iter().filter(|d| filtro.matches(d)).cloned().collect();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
            let total = matched.len() as u64;
            let window = matched
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
            Ok((window, total))
        }

        async fn get(&self, id: Uuid) -> Result<Option<divergencia::Model>, ServiceError> {
            self.check()?;
            Ok(self.rows.lock().unwrap().iter().find(|d| d.id == id).cloned())
        }

        async fn open_for_guias(&self, numeros_guia: &[String]) -> Result<Vec<divergencia::Model>, ServiceError> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|d| d.is_aberta() && numeros_guia.contains(&d.numero_guia))
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            id: Uuid,
            expected: DivergenciaStatus,
            status: DivergenciaStatus,
            resolvido_por: Option<String>,
            data_resolucao: Option<DateTimeWithTimeZone>,
        ) -> Result<Option<divergencia::Model>, ServiceError> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|d| d.id == id && d.status == expected) else { return Ok(None); };
            row.status = status;
            if resolvido_por.is_some() { row.resolvido_por = resolvido_por; }
            if data_resolucao.is_some() { row.data_resolucao = data_resolucao; }
            row.updated_at = Utc::now().into();
            Ok(Some(row.clone()))
        }

        async fn count_by_status(&self) -> Result<Vec<(DivergenciaStatus, u64)>, ServiceError> {
            self.check()?;
            let mut counts: BTreeMap<DivergenciaStatus, u64> = BTreeMap::new();
            for d in self.rows.lock().unwrap().iter() {
                *counts.entry(d.status).or_default() += 1;
            }
            Ok(counts.into_iter().collect())
        }

        async fn count_by_tipo(&self) -> Result<Vec<(DivergenciaTipo, u64)>, ServiceError> {
            self.check()?;
            let mut counts: BTreeMap<DivergenciaTipo, u64> = BTreeMap::new();
            for d in self.rows.lock().unwrap().iter() {
                *counts.entry(d.tipo).or_default() += 1;
            }
            Ok(counts.into_iter().collect())
        }

        async fn insert_many(&self, items: Vec<NewDivergencia>) -> Result<Vec<divergencia::Model>, ServiceError> {
            self.check()?;
            let models = items
                .into_iter()
                .map(divergencia::new_model)
                .collect::<Result<Vec<_>, _>>()?;
            let mut rows = self.rows.lock().unwrap();
            // same rule as uniq_divergencia_aberta
            let mut abertas: HashSet<ChaveDivergencia> =
                rows.iter().filter(|d| d.is_aberta()).map(divergencia::Model::chave).collect();
            if !models.iter().all(|m| abertas.insert(m.chave())) {
                return Err(ServiceError::Conflict("an identical divergence is already open".into()));
            }
            rows.extend(models.iter().cloned());
            Ok(models)
        }
    }
}
