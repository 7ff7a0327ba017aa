use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use uuid::Uuid;

use models::carteirinha;

use crate::carteirinha::domain::CarteirinhaFiltro;
use crate::errors::ServiceError;

#[async_trait]
pub trait CarteirinhaRepository: Send + Sync {
    /// Fails with `Conflict` when `numero` is taken.
    async fn insert(&self, row: carteirinha::Model) -> Result<carteirinha::Model, ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<carteirinha::Model>, ServiceError>;
    async fn find_by_numero(&self, numero: &str) -> Result<Option<carteirinha::Model>, ServiceError>;
    async fn list(&self, filtro: &CarteirinhaFiltro) -> Result<Vec<carteirinha::Model>, ServiceError>;
    /// Persists the mutable fields of `row`; `updated_at` is taken as given.
    async fn update(&self, row: carteirinha::Model) -> Result<carteirinha::Model, ServiceError>;
}

fn map_write_err(e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict("carteirinha numero already exists".into()),
        _ => ServiceError::db(e),
    }
}

pub struct SeaOrmCarteirinhaRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl CarteirinhaRepository for SeaOrmCarteirinhaRepository {
    async fn insert(&self, m: carteirinha::Model) -> Result<carteirinha::Model, ServiceError> {
        let am = carteirinha::ActiveModel {
            id: Set(m.id),
            numero: Set(m.numero),
            paciente_id: Set(m.paciente_id),
            plano_saude_id: Set(m.plano_saude_id),
            data_validade: Set(m.data_validade),
            status: Set(m.status),
            titular: Set(m.titular),
            created_at: Set(m.created_at),
            updated_at: Set(m.updated_at),
        };
        am.insert(&self.db).await.map_err(map_write_err)
    }

    async fn get(&self, id: Uuid) -> Result<Option<carteirinha::Model>, ServiceError> {
        carteirinha::Entity::find_by_id(id).one(&self.db).await.map_err(ServiceError::db)
    }

    async fn find_by_numero(&self, numero: &str) -> Result<Option<carteirinha::Model>, ServiceError> {
        carteirinha::Entity::find()
            .filter(carteirinha::Column::Numero.eq(numero))
            .one(&self.db)
            .await
            .map_err(ServiceError::db)
    }

    async fn list(&self, filtro: &CarteirinhaFiltro) -> Result<Vec<carteirinha::Model>, ServiceError> {
        let mut cond = Condition::all();
        if let Some(p) = filtro.paciente_id {
            cond = cond.add(carteirinha::Column::PacienteId.eq(p));
        }
        if let Some(s) = filtro.status {
            cond = cond.add(carteirinha::Column::Status.eq(s));
        }
        carteirinha::Entity::find()
            .filter(cond)
            .order_by_asc(carteirinha::Column::Numero)
            .all(&self.db)
            .await
            .map_err(ServiceError::db)
    }

    async fn update(&self, m: carteirinha::Model) -> Result<carteirinha::Model, ServiceError> {
        let am = carteirinha::ActiveModel {
            id: ActiveValue::Unchanged(m.id),
            status: Set(m.status),
            data_validade: Set(m.data_validade),
            titular: Set(m.titular),
            plano_saude_id: Set(m.plano_saude_id),
            updated_at: Set(m.updated_at),
            ..Default::default()
        };
        am.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::not_found("carteirinha"),
            other => map_write_err(other),
        })
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockCarteirinhaRepository {
        rows: Mutex<Vec<carteirinha::Model>>,
    }

    impl MockCarteirinhaRepository {
        pub fn with_rows(rows: Vec<carteirinha::Model>) -> Self { Self { rows: Mutex::new(rows) } }

        pub fn snapshot(&self) -> Vec<carteirinha::Model> { self.rows.lock().unwrap().clone() }
    }

    #[async_trait]
    impl CarteirinhaRepository for MockCarteirinhaRepository {
        async fn insert(&self, m: carteirinha::Model) -> Result<carteirinha::Model, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|r| r.numero == m.numero) {
                return Err(ServiceError::Conflict("carteirinha numero already exists".into()));
            }
            rows.push(m.clone());
            Ok(m)
        }

        async fn get(&self, id: Uuid) -> Result<Option<carteirinha::Model>, ServiceError> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn find_by_numero(&self, numero: &str) -> Result<Option<carteirinha::Model>, ServiceError> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.numero == numero).cloned())
        }

        async fn list(&self, filtro: &CarteirinhaFiltro) -> Result<Vec<carteirinha::Model>, ServiceError> {
            let mut out: Vec<_> = self.rows.lock().unwrap().iter().filter(|r| filtro.matches(r)).cloned().collect();
            out.sort_by(|a, b| a.numero.cmp(&b.numero));
            Ok(out)
        }

        async fn update(&self, m: carteirinha::Model) -> Result<carteirinha::Model, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|r| r.id == m.id) else {
                return Err(ServiceError::not_found("carteirinha"));
            };
            *row = m.clone();
            Ok(m)
        }
    }
}
