use std::sync::Arc;

use configs::ListingConfig;
use tracing::{info, instrument, warn};

use common::metrics::{GUIA_STATUS_UPDATES_TOTAL, TRANSITIONS_REJECTED_TOTAL};
use models::guia;

use crate::errors::ServiceError;
use crate::guia::domain::{GuiaFiltro, ListGuiasInput, StatusUpdate, StatusUpdateInput};
use crate::guia::repository::GuiaRepository;
use crate::pagination::{Page, PageRequest};

/// Guide listing and status workflow.
///
/// ```
/// # use std::sync::Arc;
/// # use service::guia::{repository::mock::MockGuiaRepository, service::GuiaService, domain::ListGuiasInput};
/// # tokio_test::block_on(async {
/// let svc = GuiaService::new(Arc::new(MockGuiaRepository::default()), configs::ListingConfig::default());
/// let page = svc.list(ListGuiasInput::default()).await.unwrap();
/// assert_eq!((page.total, page.pages), (0, 0));
/// # });
/// ```
pub struct GuiaService {
    repo: Arc<dyn GuiaRepository>,
    listing: ListingConfig,
}

impl GuiaService {
    pub fn new(repo: Arc<dyn GuiaRepository>, listing: ListingConfig) -> Self { Self { repo, listing } }

    #[instrument(skip(self, input))]
    pub async fn list(&self, input: ListGuiasInput) -> Result<Page<guia::Model>, ServiceError> {
        let page = PageRequest::from_input(input.limit, input.offset, &self.listing)?;
        let filtro = match &input.filters {
            Some(f) => GuiaFiltro::parse(f)?,
            None => GuiaFiltro::default(),
        };
        let (rows, total) = self.repo.list(&filtro, page).await?;
        Ok(Page::new(rows, total, page))
    }

    /// Apply a status change. `Ok(None)` when the guide does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_status(&self, input: StatusUpdateInput) -> Result<Option<guia::Model>, ServiceError> {
        let upd = StatusUpdate::parse(&input)?;
        let Some(current) = self.repo.get(upd.guia_id).await? else {
            info!(guia_id = %upd.guia_id, "guia_status_update_unknown_id");
            return Ok(None);
        };
        if let Err(e) = current.status.can_transition_to(upd.status) {
            TRANSITIONS_REJECTED_TOTAL.with_label_values(&["guia"]).inc();
            warn!(guia_id = %upd.guia_id, from = current.status.as_str(), to = upd.status.as_str(), "guia_transition_rejected");
            return Err(e.into());
        }
        let updated = self
            .repo
            .update_status(upd.guia_id, current.status, upd.status, upd.data_execucao)
            .await?;
        let Some(g) = updated else {
            // deleted, or moved by someone else since it was read
            if self.repo.get(upd.guia_id).await?.is_none() {
                return Ok(None);
            }
            TRANSITIONS_REJECTED_TOTAL.with_label_values(&["guia"]).inc();
            warn!(guia_id = %upd.guia_id, "guia_status_changed_concurrently");
            return Err(ServiceError::InvalidTransition(format!(
                "guide {} changed status concurrently; reload and retry",
                upd.guia_id
            )));
        };
        GUIA_STATUS_UPDATES_TOTAL.inc();
        info!(guia_id = %g.id, status = g.status.as_str(), "guia_status_updated");
        Ok(Some(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guia::domain::GuiaFiltersInput;
    use crate::guia::repository::mock::MockGuiaRepository;
    use chrono::{Duration, NaiveDate, Utc};
    use models::guia::{GuiaStatus, NewGuia};
    use uuid::Uuid;

    fn guide(n: usize, status: GuiaStatus) -> guia::Model {
        let mut g = guia::new_model(NewGuia {
            numero_guia: format!("G{n:03}"),
            paciente_nome: format!("Paciente {n}"),
            paciente_carteirinha: if n % 2 == 0 { "0064-A".into() } else { "0064-B".into() },
            data_atendimento: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(n as i64),
            status,
        })
        .unwrap();
        // distinct, increasing creation times
        let ts = Utc::now() - Duration::minutes(100 - n as i64);
        g.created_at = ts.into();
        g.updated_at = ts.into();
        g
    }

    fn five_guides() -> Vec<guia::Model> {
        use GuiaStatus::*;
        [Pendente, Pendente, Processado, Erro, Processado]
            .into_iter()
            .enumerate()
            .map(|(i, s)| guide(i, s))
            .collect()
    }

    fn service(repo: Arc<dyn GuiaRepository>) -> GuiaService {
        GuiaService::new(repo, ListingConfig::default())
    }

    #[tokio::test]
    async fn filter_by_status_counts_matches() {
        let svc = service(Arc::new(MockGuiaRepository::with_rows(five_guides())));
        let page = svc
            .list(ListGuiasInput {
                limit: Some(10),
                offset: Some(0),
                filters: Some(GuiaFiltersInput { status: Some("processado".into()), ..Default::default() }),
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);
        assert_eq!(page.pages, 1);
        assert!(page.items.iter().all(|g| g.status == GuiaStatus::Processado));
        // newest first
        assert!(page.items[0].created_at > page.items[1].created_at);
    }

    #[tokio::test]
    async fn windows_partition_the_result_set() {
        let rows: Vec<_> = (0..7).map(|i| guide(i, GuiaStatus::Pendente)).collect();
        let svc = service(Arc::new(MockGuiaRepository::with_rows(rows.clone())));
        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = svc
                .list(ListGuiasInput { limit: Some(3), offset: Some(offset), filters: None })
                .await
                .unwrap();
            assert_eq!(page.total, 7);
            assert_eq!(page.pages, 3);
            if page.items.is_empty() {
                break;
            }
            seen.extend(page.items.into_iter().map(|g| g.id));
            offset += 3;
        }
        assert_eq!(seen.len(), 7);
        let mut expected: Vec<_> = rows.iter().map(|g| g.id).collect();
        expected.reverse();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn combined_filters_are_anded() {
        let svc = service(Arc::new(MockGuiaRepository::with_rows(five_guides())));
        let page = svc
            .list(ListGuiasInput {
                limit: None,
                offset: None,
                filters: Some(GuiaFiltersInput {
                    carteira: Some("0064-A".into()),
                    data_inicio: Some("2024-03-02".into()),
                    data_fim: Some("2024-03-05".into()),
                    ..Default::default()
                }),
            })
            .await
            .unwrap();
        // card A holds guides 0, 2, 4; dates 03-01, 03-03, 03-05
        let numbers: Vec<_> = page.items.iter().map(|g| g.numero_guia.as_str()).collect();
        assert_eq!(numbers, vec!["G004", "G002"]);
    }

    #[tokio::test]
    async fn empty_result_has_zero_pages() {
        let svc = service(Arc::new(MockGuiaRepository::default()));
        let page = svc.list(ListGuiasInput::default()).await.unwrap();
        assert_eq!((page.items.len(), page.total, page.pages), (0, 0, 0));
    }

    #[tokio::test]
    async fn bad_limit_and_dates_are_validation_errors() {
        let svc = service(Arc::new(MockGuiaRepository::default()));
        let err = svc.list(ListGuiasInput { limit: Some(0), ..Default::default() }).await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
        let err = svc
            .list(ListGuiasInput {
                filters: Some(GuiaFiltersInput { data_inicio: Some("01/03/2024".into()), ..Default::default() }),
                ..Default::default()
            })
            .await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_fields_do_not_mutate() {
        let rows = five_guides();
        let repo = Arc::new(MockGuiaRepository::with_rows(rows.clone()));
        let svc = service(repo.clone());
        let err = svc
            .update_status(StatusUpdateInput { guia_id: Some(rows[0].id.to_string()), ..Default::default() })
            .await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
        let err = svc
            .update_status(StatusUpdateInput { status: Some("processado".into()), ..Default::default() })
            .await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
        assert_eq!(repo.snapshot(), rows);
    }

    #[tokio::test]
    async fn unknown_id_returns_none() {
        let rows = five_guides();
        let repo = Arc::new(MockGuiaRepository::with_rows(rows.clone()));
        let svc = service(repo.clone());
        let res = svc
            .update_status(StatusUpdateInput {
                guia_id: Some(Uuid::new_v4().to_string()),
                status: Some("processado".into()),
                data_execucao: None,
            })
            .await
            .unwrap();
        assert!(res.is_none());
        assert_eq!(repo.snapshot(), rows);
    }

    #[tokio::test]
    async fn update_sets_status_date_and_timestamp() {
        let rows = five_guides();
        let target = rows[0].clone();
        let repo = Arc::new(MockGuiaRepository::with_rows(rows));
        let svc = service(repo.clone());
        let updated = svc
            .update_status(StatusUpdateInput {
                guia_id: Some(target.id.to_string()),
                status: Some("processado".into()),
                data_execucao: Some("2024-03-10".into()),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, GuiaStatus::Processado);
        assert_eq!(updated.data_execucao, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert!(updated.updated_at > target.updated_at);
        assert_eq!(updated.created_at, target.created_at);
    }

    #[tokio::test]
    async fn terminal_status_rejects_transition() {
        let rows = five_guides();
        let done = rows[2].clone();
        let repo = Arc::new(MockGuiaRepository::with_rows(rows.clone()));
        let svc = service(repo.clone());
        let err = svc
            .update_status(StatusUpdateInput {
                guia_id: Some(done.id.to_string()),
                status: Some("pendente".into()),
                data_execucao: None,
            })
            .await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(repo.snapshot(), rows);
    }

    /// Serves `get` from a copy read before a concurrent update landed.
    struct StaleReads {
        inner: Arc<MockGuiaRepository>,
        seen: guia::Model,
    }

    #[async_trait::async_trait]
    impl GuiaRepository for StaleReads {
        async fn list(&self, filtro: &GuiaFiltro, page: PageRequest) -> Result<(Vec<guia::Model>, u64), ServiceError> {
            self.inner.list(filtro, page).await
        }
        async fn get(&self, _id: Uuid) -> Result<Option<guia::Model>, ServiceError> {
            Ok(Some(self.seen.clone()))
        }
        async fn find_by_numero(&self, numero: &str, carteirinha: &str) -> Result<Option<guia::Model>, ServiceError> {
            self.inner.find_by_numero(numero, carteirinha).await
        }
        async fn update_status(
            &self,
            id: Uuid,
            expected: GuiaStatus,
            status: GuiaStatus,
            data_execucao: Option<NaiveDate>,
        ) -> Result<Option<guia::Model>, ServiceError> {
            self.inner.update_status(id, expected, status, data_execucao).await
        }
    }

    #[tokio::test]
    async fn stale_read_cannot_reopen_a_processed_guide() {
        let rows = five_guides();
        let mut seen = rows[2].clone();
        seen.status = GuiaStatus::Erro;
        let repo = Arc::new(MockGuiaRepository::with_rows(rows.clone()));
        let svc = service(Arc::new(StaleReads { inner: repo.clone(), seen: seen.clone() }));

        // erro -> pendente is allowed on the stale copy; the stored row is processado
        let err = svc
            .update_status(StatusUpdateInput {
                guia_id: Some(seen.id.to_string()),
                status: Some("pendente".into()),
                data_execucao: None,
            })
            .await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(repo.snapshot(), rows);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_db_error() {
        let svc = service(Arc::new(MockGuiaRepository::failing()));
        let err = svc.list(ListGuiasInput::default()).await;
        assert!(matches!(err, Err(ServiceError::Db(_))));
        let err = svc
            .update_status(StatusUpdateInput {
                guia_id: Some(Uuid::new_v4().to_string()),
                status: Some("erro".into()),
                data_execucao: None,
            })
            .await;
        assert!(matches!(err, Err(ServiceError::Db(_))));
    }
}
