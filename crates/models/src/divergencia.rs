//! Reconciliation findings (`divergencias`).

use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, guia, limits};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DivergenciaStatus {
    #[sea_orm(string_value = "pendente")]
    Pendente,
    #[sea_orm(string_value = "em_analise")]
    EmAnalise,
    #[sea_orm(string_value = "resolvida")]
    Resolvida,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DivergenciaTipo {
    /// Execution without attendance sheet, or sheet without execution.
    #[sea_orm(string_value = "ausencia")]
    Ausencia,
    #[sea_orm(string_value = "duplicidade")]
    Duplicidade,
    #[sea_orm(string_value = "data_divergente")]
    DataDivergente,
    #[sea_orm(string_value = "profissional_divergente")]
    ProfissionalDivergente,
    #[sea_orm(string_value = "assinatura_ausente")]
    AssinaturaAusente,
}

impl DivergenciaStatus {
    pub const ALL: [DivergenciaStatus; 3] =
        [DivergenciaStatus::Pendente, DivergenciaStatus::EmAnalise, DivergenciaStatus::Resolvida];

    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenciaStatus::Pendente => "pendente",
            DivergenciaStatus::EmAnalise => "em_analise",
            DivergenciaStatus::Resolvida => "resolvida",
        }
    }

    pub fn parse(s: &str) -> Result<Self, errors::ModelError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pendente" => Ok(DivergenciaStatus::Pendente),
            "em_analise" => Ok(DivergenciaStatus::EmAnalise),
            "resolvida" => Ok(DivergenciaStatus::Resolvida),
            other => Err(errors::ModelError::Validation(format!("unknown divergence status '{other}'"))),
        }
    }

    /// pendente → em_analise → resolvida, with em_analise → pendente for
    /// items sent back. resolvida is terminal.
    pub fn valid_transitions(&self) -> &'static [DivergenciaStatus] {
        match self {
            DivergenciaStatus::Pendente => &[DivergenciaStatus::EmAnalise],
            DivergenciaStatus::EmAnalise => &[DivergenciaStatus::Resolvida, DivergenciaStatus::Pendente],
            DivergenciaStatus::Resolvida => &[],
        }
    }

    pub fn can_transition_to(&self, target: DivergenciaStatus) -> Result<(), errors::ModelError> {
        if self.valid_transitions().contains(&target) {
            return Ok(());
        }
        Err(errors::ModelError::InvalidTransition(format!(
            "divergence cannot move from {} to {}",
            self.as_str(),
            target.as_str()
        )))
    }
}

impl DivergenciaTipo {
    pub const ALL: [DivergenciaTipo; 5] = [
        DivergenciaTipo::Ausencia,
        DivergenciaTipo::Duplicidade,
        DivergenciaTipo::DataDivergente,
        DivergenciaTipo::ProfissionalDivergente,
        DivergenciaTipo::AssinaturaAusente,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenciaTipo::Ausencia => "ausencia",
            DivergenciaTipo::Duplicidade => "duplicidade",
            DivergenciaTipo::DataDivergente => "data_divergente",
            DivergenciaTipo::ProfissionalDivergente => "profissional_divergente",
            DivergenciaTipo::AssinaturaAusente => "assinatura_ausente",
        }
    }

    pub fn parse(s: &str) -> Result<Self, errors::ModelError> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| errors::ModelError::Validation(format!("unknown divergence type '{wanted}'")))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "divergencias")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub guia_id: Option<Uuid>,
    pub numero_guia: String,
    pub data_execucao: Option<Date>,
    pub data_atendimento: Option<Date>,
    pub data_identificacao: Date,
    pub data_registro: Option<Date>,
    pub codigo_ficha: Option<String>,
    pub paciente_nome: String,
    pub carteirinha: String,
    pub status: DivergenciaStatus,
    pub tipo: DivergenciaTipo,
    pub descricao: String,
    pub possui_assinatura: bool,
    pub arquivo_digitalizado: Option<String>,
    pub resolvido_por: Option<String>,
    pub data_resolucao: Option<DateTimeWithTimeZone>,
    pub sessoes_autorizadas: Option<i32>,
    pub sessoes_executadas: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Guia }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Guia => Entity::belongs_to(guia::Entity)
                .from(Column::GuiaId)
                .to(guia::Column::Id)
                .into(),
        }
    }
}

impl Related<guia::Entity> for Entity {
    fn to() -> RelationDef { Relation::Guia.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// A finding ready to be stored; always starts as `pendente`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDivergencia {
    pub guia_id: Option<Uuid>,
    pub numero_guia: String,
    pub data_execucao: Option<Date>,
    pub data_atendimento: Option<Date>,
    pub data_identificacao: Date,
    pub codigo_ficha: Option<String>,
    pub paciente_nome: String,
    pub carteirinha: String,
    pub tipo: DivergenciaTipo,
    pub descricao: String,
    pub possui_assinatura: bool,
    pub arquivo_digitalizado: Option<String>,
    pub sessoes_autorizadas: Option<i32>,
    pub sessoes_executadas: Option<i32>,
}

/// Identity of a finding across audit runs. At most one unresolved
/// divergence exists per key (`uniq_divergencia_aberta`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChaveDivergencia {
    pub tipo: DivergenciaTipo,
    pub numero_guia: String,
    pub carteirinha: String,
    pub data_execucao: Option<Date>,
    pub codigo_ficha: Option<String>,
}

impl NewDivergencia {
    pub fn chave(&self) -> ChaveDivergencia {
        ChaveDivergencia {
            tipo: self.tipo,
            numero_guia: self.numero_guia.clone(),
            carteirinha: self.carteirinha.clone(),
            data_execucao: self.data_execucao,
            codigo_ficha: self.codigo_ficha.clone(),
        }
    }
}

impl Model {
    pub fn chave(&self) -> ChaveDivergencia {
        ChaveDivergencia {
            tipo: self.tipo,
            numero_guia: self.numero_guia.clone(),
            carteirinha: self.carteirinha.clone(),
            data_execucao: self.data_execucao,
            codigo_ficha: self.codigo_ficha.clone(),
        }
    }

    pub fn is_aberta(&self) -> bool { self.status != DivergenciaStatus::Resolvida }
}

pub fn new_model(input: NewDivergencia) -> Result<Model, errors::ModelError> {
    if input.numero_guia.trim().is_empty() {
        return Err(errors::ModelError::Validation("numero_guia required".into()));
    }
    if input.carteirinha.trim().is_empty() {
        return Err(errors::ModelError::Validation("carteirinha required".into()));
    }
    limits::check_len("numero_guia", &input.numero_guia, limits::NUMERO_GUIA)?;
    limits::check_len("carteirinha", &input.carteirinha, limits::CARTEIRINHA)?;
    limits::check_len("paciente_nome", &input.paciente_nome, limits::PACIENTE_NOME)?;
    if let Some(c) = &input.codigo_ficha {
        limits::check_len("codigo_ficha", c, limits::CODIGO_FICHA)?;
    }
    if let Some(a) = &input.arquivo_digitalizado {
        limits::check_len("arquivo_digitalizado", a, limits::ARQUIVO)?;
    }
    let now = Utc::now().into();
    Ok(Model {
        id: Uuid::new_v4(),
        guia_id: input.guia_id,
        numero_guia: input.numero_guia,
        data_execucao: input.data_execucao,
        data_atendimento: input.data_atendimento,
        data_identificacao: input.data_identificacao,
        data_registro: Some(Utc::now().date_naive()),
        codigo_ficha: input.codigo_ficha,
        paciente_nome: input.paciente_nome,
        carteirinha: input.carteirinha,
        status: DivergenciaStatus::Pendente,
        tipo: input.tipo,
        descricao: input.descricao,
        possui_assinatura: input.possui_assinatura,
        arquivo_digitalizado: input.arquivo_digitalizado,
        resolvido_por: None,
        data_resolucao: None,
        sessoes_autorizadas: input.sessoes_autorizadas,
        sessoes_executadas: input.sessoes_executadas,
        created_at: now,
        updated_at: now,
    })
}

/// Every field as `Set`, for inserts.
pub fn to_active_model(m: Model) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        guia_id: Set(m.guia_id),
        numero_guia: Set(m.numero_guia),
        data_execucao: Set(m.data_execucao),
        data_atendimento: Set(m.data_atendimento),
        data_identificacao: Set(m.data_identificacao),
        data_registro: Set(m.data_registro),
        codigo_ficha: Set(m.codigo_ficha),
        paciente_nome: Set(m.paciente_nome),
        carteirinha: Set(m.carteirinha),
        status: Set(m.status),
        tipo: Set(m.tipo),
        descricao: Set(m.descricao),
        possui_assinatura: Set(m.possui_assinatura),
        arquivo_digitalizado: Set(m.arquivo_digitalizado),
        resolvido_por: Set(m.resolvido_por),
        data_resolucao: Set(m.data_resolucao),
        sessoes_autorizadas: Set(m.sessoes_autorizadas),
        sessoes_executadas: Set(m.sessoes_executadas),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
