use std::sync::Arc;

use chrono::Utc;
use configs::ListingConfig;
use sea_orm::prelude::DateTimeWithTimeZone;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::metrics::TRANSITIONS_REJECTED_TOTAL;
use models::divergencia::{self, DivergenciaStatus};

use crate::divergencia::domain::{
    AuditoriaResumo, DivergenciaFiltro, DivergenciaStatusInput, DivergenciaStatusUpdate, ListDivergenciasInput,
};
use crate::divergencia::repository::DivergenciaRepository;
use crate::errors::ServiceError;
use crate::pagination::{Page, PageRequest};

/// Review workflow over stored reconciliation findings.
pub struct DivergenciaService {
    repo: Arc<dyn DivergenciaRepository>,
    listing: ListingConfig,
}

impl DivergenciaService {
    pub fn new(repo: Arc<dyn DivergenciaRepository>, listing: ListingConfig) -> Self { Self { repo, listing } }

    #[instrument(skip(self, input))]
    pub async fn list(&self, input: ListDivergenciasInput) -> Result<Page<divergencia::Model>, ServiceError> {
        let page = PageRequest::from_input(input.limit, input.offset, &self.listing)?;
        let filtro = input.filters.as_ref().map(DivergenciaFiltro::parse).transpose()?.unwrap_or_default();
        let (rows, total) = self.repo.list(&filtro, page).await?;
        Ok(Page::new(rows, total, page))
    }

    pub async fn get(&self, id: Uuid) -> Result<divergencia::Model, ServiceError> {
        self.repo.get(id).await?.ok_or_else(|| ServiceError::not_found("divergencia"))
    }

    #[instrument(skip(self, input))]
    pub async fn update_status(&self, input: DivergenciaStatusInput) -> Result<divergencia::Model, ServiceError> {
        let upd = DivergenciaStatusUpdate::parse(&input)?;
        let current = self.get(upd.divergencia_id).await?;
        if let Err(e) = current.status.can_transition_to(upd.status) {
            TRANSITIONS_REJECTED_TOTAL.with_label_values(&["divergencia"]).inc();
            warn!(
                divergencia_id = %upd.divergencia_id,
                from = current.status.as_str(),
                to = upd.status.as_str(),
                "divergencia_transition_rejected"
            );
            return Err(e.into());
        }
        // resolver fields are written once, on entering resolvida
        let (resolvido_por, data_resolucao): (Option<String>, Option<DateTimeWithTimeZone>) =
            if upd.status == DivergenciaStatus::Resolvida {
                (upd.resolvido_por, Some(Utc::now().into()))
            } else {
                (None, None)
            };
        let Some(updated) = self
            .repo
            .update_status(upd.divergencia_id, current.status, upd.status, resolvido_por, data_resolucao)
            .await?
        else {
            // moved by someone else since it was read
            self.get(upd.divergencia_id).await?;
            TRANSITIONS_REJECTED_TOTAL.with_label_values(&["divergencia"]).inc();
            warn!(divergencia_id = %upd.divergencia_id, "divergencia_status_changed_concurrently");
            return Err(ServiceError::InvalidTransition(format!(
                "divergence {} changed status concurrently; reload and retry",
                upd.divergencia_id
            )));
        };
        info!(divergencia_id = %updated.id, status = updated.status.as_str(), "divergencia_status_updated");
        Ok(updated)
    }

    pub async fn resumo(&self) -> Result<AuditoriaResumo, ServiceError> {
        let por_status = self.repo.count_by_status().await?;
        let por_tipo = self.repo.count_by_tipo().await?;
        Ok(AuditoriaResumo::from_counts(por_status, por_tipo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divergencia::domain::DivergenciaFiltersInput;
    use crate::divergencia::repository::mock::MockDivergenciaRepository;
    use chrono::NaiveDate;
    use models::divergencia::{DivergenciaTipo, NewDivergencia};

    fn finding(tipo: DivergenciaTipo, status: DivergenciaStatus, day: u32) -> divergencia::Model {
        let d = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let mut m = divergencia::new_model(NewDivergencia {
            guia_id: None,
            numero_guia: format!("G{day}"),
            data_execucao: Some(d),
            data_atendimento: None,
            data_identificacao: d,
            codigo_ficha: None,
            paciente_nome: "Paciente".into(),
            carteirinha: "0064".into(),
            tipo,
            descricao: tipo.as_str().into(),
            possui_assinatura: false,
            arquivo_digitalizado: None,
            sessoes_autorizadas: None,
            sessoes_executadas: Some(1),
        })
        .unwrap();
        m.status = status;
        m
    }

    fn service(rows: Vec<divergencia::Model>) -> (Arc<MockDivergenciaRepository>, DivergenciaService) {
        let repo = Arc::new(MockDivergenciaRepository::with_rows(rows));
        (repo.clone(), DivergenciaService::new(repo, ListingConfig::default()))
    }

    fn status_input(id: Uuid, status: &str, by: Option<&str>) -> DivergenciaStatusInput {
        DivergenciaStatusInput {
            divergencia_id: Some(id.to_string()),
            status: Some(status.into()),
            resolvido_por: by.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn list_filters_by_tipo_and_date_range() {
        use DivergenciaStatus::*;
        use DivergenciaTipo::*;
        let (_, svc) = service(vec![
            finding(Ausencia, Pendente, 1),
            finding(Duplicidade, Pendente, 2),
            finding(Ausencia, EmAnalise, 10),
            finding(Ausencia, Pendente, 20),
        ]);
        let page = svc
            .list(ListDivergenciasInput {
                limit: Some(1),
                offset: None,
                filters: Some(DivergenciaFiltersInput {
                    tipo: Some("ausencia".into()),
                    data_inicio: Some("2024-05-01".into()),
                    data_fim: Some("2024-05-10".into()),
                    ..Default::default()
                }),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn full_review_cycle_stamps_resolution() {
        let row = finding(DivergenciaTipo::DataDivergente, DivergenciaStatus::Pendente, 3);
        let (repo, svc) = service(vec![row.clone()]);

        let d = svc.update_status(status_input(row.id, "em_analise", None)).await.unwrap();
        assert_eq!(d.status, DivergenciaStatus::EmAnalise);
        assert!(d.data_resolucao.is_none());

        let d = svc.update_status(status_input(row.id, "resolvida", Some("Marta"))).await.unwrap();
        assert_eq!(d.status, DivergenciaStatus::Resolvida);
        assert_eq!(d.resolvido_por.as_deref(), Some("Marta"));
        assert!(d.data_resolucao.is_some());
        assert_eq!(repo.snapshot()[0], d);
    }

    #[tokio::test]
    async fn skipping_analysis_is_rejected() {
        let row = finding(DivergenciaTipo::Ausencia, DivergenciaStatus::Pendente, 3);
        let (repo, svc) = service(vec![row.clone()]);
        let err = svc.update_status(status_input(row.id, "resolvida", Some("Marta"))).await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(repo.snapshot(), vec![row]);
    }

    #[tokio::test]
    async fn resolved_is_terminal() {
        let row = finding(DivergenciaTipo::Ausencia, DivergenciaStatus::Resolvida, 3);
        let (_, svc) = service(vec![row.clone()]);
        let err = svc.update_status(status_input(row.id, "pendente", None)).await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition(_))));
    }

    /// Serves reads from a snapshot taken before another reviewer acted.
    struct StaleReads {
        inner: Arc<MockDivergenciaRepository>,
        seen: divergencia::Model,
    }

    #[async_trait::async_trait]
    impl DivergenciaRepository for StaleReads {
        async fn list(
            &self,
            filtro: &DivergenciaFiltro,
            page: PageRequest,
        ) -> Result<(Vec<divergencia::Model>, u64), ServiceError> {
            self.inner.list(filtro, page).await
        }
        async fn get(&self, _id: Uuid) -> Result<Option<divergencia::Model>, ServiceError> {
            Ok(Some(self.seen.clone()))
        }
        async fn open_for_guias(&self, numeros: &[String]) -> Result<Vec<divergencia::Model>, ServiceError> {
            self.inner.open_for_guias(numeros).await
        }
        async fn update_status(
            &self,
            id: Uuid,
            expected: DivergenciaStatus,
            status: DivergenciaStatus,
            resolvido_por: Option<String>,
            data_resolucao: Option<DateTimeWithTimeZone>,
        ) -> Result<Option<divergencia::Model>, ServiceError> {
            self.inner.update_status(id, expected, status, resolvido_por, data_resolucao).await
        }
        async fn count_by_status(&self) -> Result<Vec<(DivergenciaStatus, u64)>, ServiceError> {
            self.inner.count_by_status().await
        }
        async fn count_by_tipo(&self) -> Result<Vec<(DivergenciaTipo, u64)>, ServiceError> {
            self.inner.count_by_tipo().await
        }
        async fn insert_many(&self, items: Vec<NewDivergencia>) -> Result<Vec<divergencia::Model>, ServiceError> {
            self.inner.insert_many(items).await
        }
    }

    #[tokio::test]
    async fn stale_read_cannot_reopen_a_resolved_divergence() {
        let seen = finding(DivergenciaTipo::Ausencia, DivergenciaStatus::EmAnalise, 3);
        let mut resolved = seen.clone();
        resolved.status = DivergenciaStatus::Resolvida;
        resolved.resolvido_por = Some("Marta".into());
        let inner = Arc::new(MockDivergenciaRepository::with_rows(vec![resolved.clone()]));
        let svc = DivergenciaService::new(
            Arc::new(StaleReads { inner: inner.clone(), seen: seen.clone() }),
            ListingConfig::default(),
        );

        // em_analise -> pendente passes the table check against the stale copy
        let err = svc.update_status(status_input(seen.id, "pendente", None)).await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(inner.snapshot(), vec![resolved]);
    }

    #[tokio::test]
    async fn unknown_divergence_is_not_found() {
        let (_, svc) = service(vec![]);
        assert!(matches!(svc.get(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
        let err = svc.update_status(status_input(Uuid::new_v4(), "em_analise", None)).await;
        assert!(matches!(err, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn summary_counts_every_bucket() {
        use DivergenciaStatus::*;
        use DivergenciaTipo::*;
        let (_, svc) = service(vec![
            finding(Ausencia, Pendente, 1),
            finding(Ausencia, Resolvida, 2),
            finding(AssinaturaAusente, Pendente, 3),
        ]);
        let r = svc.resumo().await.unwrap();
        assert_eq!(r.total, 3);
        assert_eq!(r.por_status["pendente"], 2);
        assert_eq!(r.por_status["em_analise"], 0);
        assert_eq!(r.por_tipo["ausencia"], 2);
        assert_eq!(r.por_tipo["assinatura_ausente"], 1);
    }

    #[tokio::test]
    async fn failures_map_to_db_error() {
        let svc = DivergenciaService::new(Arc::new(MockDivergenciaRepository::failing()), ListingConfig::default());
        assert!(matches!(svc.resumo().await, Err(ServiceError::Db(_))));
        assert!(matches!(svc.list(ListDivergenciasInput::default()).await, Err(ServiceError::Db(_))));
    }
}
