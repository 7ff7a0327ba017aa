use std::collections::BTreeMap;

use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct GuiaFiltersDoc {
    pub numero_guia: Option<String>,
    /// Card number, matched against `paciente_carteirinha`.
    pub carteira: Option<String>,
    /// YYYY-MM-DD, inclusive, on `data_atendimento`.
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
    /// pendente | processado | erro
    pub status: Option<String>,
}

#[derive(ToSchema)]
pub struct ListGuiasInputDoc {
    /// 1..=1000, default 100
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub filters: Option<GuiaFiltersDoc>,
}

#[derive(ToSchema)]
pub struct GuiaDoc {
    pub id: Uuid,
    pub numero_guia: String,
    pub paciente_nome: String,
    pub paciente_carteirinha: String,
    pub data_atendimento: String,
    pub data_execucao: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema)]
pub struct GuiasPageDoc {
    pub guides: Vec<GuiaDoc>,
    pub total: u64,
    pub pages: u64,
}

#[derive(ToSchema)]
pub struct StatusUpdateInputDoc {
    pub guia_id: String,
    pub status: String,
    pub data_execucao: Option<String>,
}

#[derive(ToSchema)]
pub struct DivergenciaFiltersDoc {
    pub status: Option<String>,
    pub tipo: Option<String>,
    pub carteirinha: Option<String>,
    pub numero_guia: Option<String>,
    /// YYYY-MM-DD, inclusive, on `data_identificacao`.
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
}

#[derive(ToSchema)]
pub struct ListDivergenciasInputDoc {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub filters: Option<DivergenciaFiltersDoc>,
}

#[derive(ToSchema)]
pub struct DivergenciaDoc {
    pub id: Uuid,
    pub guia_id: Option<Uuid>,
    pub numero_guia: String,
    pub data_execucao: Option<String>,
    pub data_atendimento: Option<String>,
    pub data_identificacao: String,
    pub data_registro: Option<String>,
    pub codigo_ficha: Option<String>,
    pub paciente_nome: String,
    pub carteirinha: String,
    pub status: String,
    pub tipo: String,
    pub descricao: String,
    pub possui_assinatura: bool,
    pub arquivo_digitalizado: Option<String>,
    pub resolvido_por: Option<String>,
    pub data_resolucao: Option<String>,
    pub sessoes_autorizadas: Option<i32>,
    pub sessoes_executadas: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema)]
pub struct DivergenciasPageDoc {
    pub divergencias: Vec<DivergenciaDoc>,
    pub total: u64,
    pub pages: u64,
}

#[derive(ToSchema)]
pub struct DivergenciaStatusInputDoc {
    pub divergencia_id: String,
    /// pendente | em_analise | resolvida
    pub status: String,
    /// Required when moving to resolvida.
    pub resolvido_por: Option<String>,
}

#[derive(ToSchema)]
pub struct AuditoriaResumoDoc {
    pub total: u64,
    pub por_status: BTreeMap<String, u64>,
    pub por_tipo: BTreeMap<String, u64>,
}

#[derive(ToSchema)]
pub struct ExecucaoDoc {
    pub numero_guia: String,
    pub carteirinha: String,
    pub paciente_nome: Option<String>,
    pub data_execucao: String,
    pub profissional: Option<String>,
    pub codigo_ficha: Option<String>,
}

#[derive(ToSchema)]
pub struct FichaDoc {
    pub codigo_ficha: String,
    pub numero_guia: String,
    pub carteirinha: String,
    pub paciente_nome: Option<String>,
    pub data_atendimento: String,
    pub profissional: Option<String>,
    pub possui_assinatura: Option<bool>,
    pub arquivo: Option<String>,
}

#[derive(ToSchema)]
pub struct AutorizacaoDoc {
    pub numero_guia: String,
    pub sessoes_autorizadas: i32,
}

#[derive(ToSchema)]
pub struct AuditoriaRequestDoc {
    pub execucoes: Vec<ExecucaoDoc>,
    pub fichas: Vec<FichaDoc>,
    pub autorizacoes: Option<Vec<AutorizacaoDoc>>,
    /// Store findings as pending divergences.
    pub registrar: Option<bool>,
}

#[derive(ToSchema)]
pub struct DivergenciaDetectadaDoc {
    pub tipo: String,
    pub numero_guia: String,
    pub carteirinha: String,
    pub paciente_nome: String,
    pub data_execucao: Option<String>,
    pub data_atendimento: Option<String>,
    pub codigo_ficha: Option<String>,
    pub possui_assinatura: bool,
    pub arquivo_digitalizado: Option<String>,
    pub sessoes_autorizadas: Option<i32>,
    pub sessoes_executadas: i32,
    pub descricao: String,
}

#[derive(ToSchema)]
pub struct AuditoriaResultadoDoc {
    pub total_execucoes: u64,
    pub total_fichas: u64,
    pub total_conferidos: u64,
    pub divergencias: Vec<DivergenciaDetectadaDoc>,
    pub por_tipo: BTreeMap<String, u64>,
    pub divergencias_registradas: u64,
    /// Findings already open from an earlier run, left as they are.
    pub divergencias_ignoradas: u64,
}

#[derive(ToSchema)]
pub struct CarteirinhaDoc {
    pub id: Uuid,
    pub numero: String,
    pub paciente_id: Uuid,
    pub plano_saude_id: Option<Uuid>,
    pub data_validade: Option<String>,
    pub status: String,
    pub titular: bool,
    pub created_at: String,
    pub updated_at: String,
    /// `ativa` and not past `data_validade` today.
    pub vigente: bool,
}

#[derive(ToSchema)]
pub struct CreateCarteirinhaInputDoc {
    pub numero: String,
    pub paciente_id: String,
    pub plano_saude_id: Option<String>,
    pub data_validade: Option<String>,
    pub titular: Option<bool>,
}

#[derive(ToSchema)]
pub struct UpdateCarteirinhaInputDoc {
    pub status: Option<String>,
    pub data_validade: Option<String>,
    pub titular: Option<bool>,
    pub plano_saude_id: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::guias::list,
        crate::routes::guias::update_status,
        crate::routes::divergencias::list,
        crate::routes::divergencias::resumo,
        crate::routes::divergencias::get,
        crate::routes::divergencias::update_status,
        crate::routes::auditoria::auditar,
        crate::routes::carteirinhas::list,
        crate::routes::carteirinhas::create,
        crate::routes::carteirinhas::get,
        crate::routes::carteirinhas::update,
    ),
    components(
        schemas(
            HealthResponse,
            crate::errors::ErrorBody,
            GuiaFiltersDoc,
            ListGuiasInputDoc,
            GuiaDoc,
            GuiasPageDoc,
            StatusUpdateInputDoc,
            DivergenciaFiltersDoc,
            ListDivergenciasInputDoc,
            DivergenciaDoc,
            DivergenciasPageDoc,
            DivergenciaStatusInputDoc,
            AuditoriaResumoDoc,
            ExecucaoDoc,
            FichaDoc,
            AutorizacaoDoc,
            AuditoriaRequestDoc,
            DivergenciaDetectadaDoc,
            AuditoriaResultadoDoc,
            CarteirinhaDoc,
            CreateCarteirinhaInputDoc,
            UpdateCarteirinhaInputDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "guias"),
        (name = "divergencias"),
        (name = "auditoria"),
        (name = "carteirinhas")
    )
)]
pub struct ApiDoc;
