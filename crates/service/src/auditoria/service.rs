use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use common::metrics::{DIVERGENCIAS_DETECTED_TOTAL, DIVERGENCIAS_REGISTERED_TOTAL};
use models::divergencia::{self, ChaveDivergencia, NewDivergencia};

use crate::auditoria::reconcile::{conciliar, validar, AuditoriaEntrada, AuditoriaResultado};
use crate::divergencia::repository::DivergenciaRepository;
use crate::errors::ServiceError;
use crate::guia::repository::GuiaRepository;

/// Runs reconciliations and, on request, files the findings for review.
pub struct AuditoriaService {
    guias: Arc<dyn GuiaRepository>,
    divergencias: Arc<dyn DivergenciaRepository>,
}

impl AuditoriaService {
    pub fn new(guias: Arc<dyn GuiaRepository>, divergencias: Arc<dyn DivergenciaRepository>) -> Self {
        Self { guias, divergencias }
    }

    #[instrument(skip(self, entrada), fields(execucoes = entrada.execucoes.len(), fichas = entrada.fichas.len()))]
    pub async fn auditar(&self, entrada: AuditoriaEntrada, registrar: bool) -> Result<AuditoriaResultado, ServiceError> {
        validar(&entrada)?;
        let mut resultado = conciliar(&entrada);
        for d in &resultado.divergencias {
            DIVERGENCIAS_DETECTED_TOTAL.with_label_values(&[d.tipo.as_str()]).inc();
        }
        info!(
            divergencias = resultado.divergencias.len(),
            conferidos = resultado.total_conferidos,
            "auditoria_concluida"
        );
        if !registrar || resultado.divergencias.is_empty() {
            return Ok(resultado);
        }

        // a finding still open from an earlier run, or repeated in this one, is filed once
        let numeros: Vec<String> = resultado
            .divergencias
            .iter()
            .map(|d| d.numero_guia.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut vistas: HashSet<ChaveDivergencia> = self
            .divergencias
            .open_for_guias(&numeros)
            .await?
            .iter()
            .map(divergencia::Model::chave)
            .collect();

        let hoje = Utc::now().date_naive();
        let mut guia_ids: HashMap<(String, String), Option<Uuid>> = HashMap::new();
        let mut novas = Vec::with_capacity(resultado.divergencias.len());
        let mut ignoradas = 0;
        for d in &resultado.divergencias {
            let mut nova = NewDivergencia {
                guia_id: None,
                numero_guia: d.numero_guia.clone(),
                data_execucao: d.data_execucao,
                data_atendimento: d.data_atendimento,
                data_identificacao: hoje,
                codigo_ficha: d.codigo_ficha.clone(),
                paciente_nome: d.paciente_nome.clone(),
                carteirinha: d.carteirinha.clone(),
                tipo: d.tipo,
                descricao: d.descricao.clone(),
                possui_assinatura: d.possui_assinatura,
                arquivo_digitalizado: d.arquivo_digitalizado.clone(),
                sessoes_autorizadas: d.sessoes_autorizadas,
                sessoes_executadas: Some(d.sessoes_executadas),
            };
            if !vistas.insert(nova.chave()) {
                ignoradas += 1;
                continue;
            }
            let key = (d.numero_guia.clone(), d.carteirinha.clone());
            nova.guia_id = match guia_ids.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self.guias.find_by_numero(&d.numero_guia, &d.carteirinha).await?.map(|g| g.id);
                    guia_ids.insert(key, id);
                    id
                }
            };
            novas.push(nova);
        }
        resultado.divergencias_ignoradas = ignoradas;
        if novas.is_empty() {
            info!(ignoradas, "auditoria_nada_a_registrar");
            return Ok(resultado);
        }
        let salvas = self.divergencias.insert_many(novas).await?;
        DIVERGENCIAS_REGISTERED_TOTAL.inc_by(salvas.len() as u64);
        info!(registradas = salvas.len(), ignoradas, "auditoria_divergencias_registradas");
        resultado.divergencias_registradas = salvas.len();
        Ok(resultado)
    }
}
