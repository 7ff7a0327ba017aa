use std::sync::Arc;

use configs::ListingConfig;
use sea_orm::DatabaseConnection;

use service::auditoria::service::AuditoriaService;
use service::carteirinha::repository::{CarteirinhaRepository, SeaOrmCarteirinhaRepository};
use service::carteirinha::service::CarteirinhaService;
use service::divergencia::repository::{DivergenciaRepository, SeaOrmDivergenciaRepository};
use service::divergencia::service::DivergenciaService;
use service::guia::repository::{GuiaRepository, SeaOrmGuiaRepository};
use service::guia::service::GuiaService;

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub guias: Arc<GuiaService>,
    pub divergencias: Arc<DivergenciaService>,
    pub carteirinhas: Arc<CarteirinhaService>,
    pub auditoria: Arc<AuditoriaService>,
}

impl AppState {
    pub fn new(
        guias: Arc<dyn GuiaRepository>,
        divergencias: Arc<dyn DivergenciaRepository>,
        carteirinhas: Arc<dyn CarteirinhaRepository>,
        listing: ListingConfig,
    ) -> Self {
        Self {
            guias: Arc::new(GuiaService::new(Arc::clone(&guias), listing)),
            divergencias: Arc::new(DivergenciaService::new(Arc::clone(&divergencias), listing)),
            carteirinhas: Arc::new(CarteirinhaService::new(carteirinhas)),
            auditoria: Arc::new(AuditoriaService::new(guias, divergencias)),
        }
    }

    /// SeaORM repositories over one pool.
    pub fn from_db(db: DatabaseConnection, listing: ListingConfig) -> Self {
        Self::new(
            Arc::new(SeaOrmGuiaRepository { db: db.clone() }),
            Arc::new(SeaOrmDivergenciaRepository { db: db.clone() }),
            Arc::new(SeaOrmCarteirinhaRepository { db }),
            listing,
        )
    }
}
