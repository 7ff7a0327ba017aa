use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use models::carteirinha;

use crate::carteirinha::domain::{
    CarteirinhaChanges, CarteirinhaFiltro, CarteirinhaView, CreateCarteirinhaInput, ListCarteirinhasQuery,
    UpdateCarteirinhaInput,
};
use crate::carteirinha::repository::CarteirinhaRepository;
use crate::errors::ServiceError;

pub struct CarteirinhaService {
    repo: Arc<dyn CarteirinhaRepository>,
}

impl CarteirinhaService {
    pub fn new(repo: Arc<dyn CarteirinhaRepository>) -> Self { Self { repo } }

    /// Validity is judged against today's date (UTC).
    pub fn view(c: carteirinha::Model) -> CarteirinhaView { CarteirinhaView::em(c, Utc::now().date_naive()) }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateCarteirinhaInput) -> Result<carteirinha::Model, ServiceError> {
        let new = input.parse()?;
        if self.repo.find_by_numero(&new.numero).await?.is_some() {
            return Err(ServiceError::Conflict(format!("carteirinha {} already exists", new.numero)));
        }
        let created = self.repo.insert(carteirinha::new_model(new)?).await?;
        info!(carteirinha_id = %created.id, paciente_id = %created.paciente_id, "carteirinha_created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<carteirinha::Model, ServiceError> {
        self.repo.get(id).await?.ok_or_else(|| ServiceError::not_found("carteirinha"))
    }

    pub async fn list(&self, query: ListCarteirinhasQuery) -> Result<Vec<carteirinha::Model>, ServiceError> {
        let filtro = CarteirinhaFiltro::parse(&query)?;
        self.repo.list(&filtro).await
    }

    #[instrument(skip(self, input), fields(carteirinha_id = %id))]
    pub async fn update(&self, id: Uuid, input: UpdateCarteirinhaInput) -> Result<carteirinha::Model, ServiceError> {
        let changes = CarteirinhaChanges::parse(&input)?;
        let mut current = self.get(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }
        changes.apply(&mut current);
        current.updated_at = Utc::now().into();
        let updated = self.repo.update(current).await?;
        info!(status = updated.status.as_str(), "carteirinha_updated");
        Ok(updated)
    }
}
