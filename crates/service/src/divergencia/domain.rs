use std::collections::BTreeMap;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::divergencia::{self, DivergenciaStatus, DivergenciaTipo};
use models::limits;

use crate::errors::ServiceError;
use crate::input::{non_blank, owned_non_blank, parse_date, require, require_uuid};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DivergenciaFiltersInput {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub carteirinha: Option<String>,
    #[serde(default)]
    pub numero_guia: Option<String>,
    #[serde(default)]
    pub data_inicio: Option<String>,
    #[serde(default)]
    pub data_fim: Option<String>,
}

/// Body of `POST /api/divergencias`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDivergenciasInput {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub filters: Option<DivergenciaFiltersInput>,
}

/// Date bounds apply to `data_identificacao`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivergenciaFiltro {
    pub status: Option<DivergenciaStatus>,
    pub tipo: Option<DivergenciaTipo>,
    pub carteirinha: Option<String>,
    pub numero_guia: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

impl DivergenciaFiltro {
    pub fn parse(input: &DivergenciaFiltersInput) -> Result<Self, ServiceError> {
        let status = non_blank(input.status.as_deref()).map(DivergenciaStatus::parse).transpose()?;
        let tipo = non_blank(input.tipo.as_deref()).map(DivergenciaTipo::parse).transpose()?;
        Ok(Self {
            status,
            tipo,
            carteirinha: owned_non_blank(input.carteirinha.as_deref()),
            numero_guia: owned_non_blank(input.numero_guia.as_deref()),
            data_inicio: parse_date("data_inicio", input.data_inicio.as_deref())?,
            data_fim: parse_date("data_fim", input.data_fim.as_deref())?,
        })
    }

    pub fn matches(&self, d: &divergencia::Model) -> bool {
        self.status.map_or(true, |s| d.status == s)
            && self.tipo.map_or(true, |t| d.tipo == t)
            && self.carteirinha.as_ref().map_or(true, |c| &d.carteirinha == c)
            && self.numero_guia.as_ref().map_or(true, |n| &d.numero_guia == n)
            && self.data_inicio.map_or(true, |x| d.data_identificacao >= x)
            && self.data_fim.map_or(true, |x| d.data_identificacao <= x)
    }

    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(s) = self.status {
            cond = cond.add(divergencia::Column::Status.eq(s));
        }
        if let Some(t) = self.tipo {
            cond = cond.add(divergencia::Column::Tipo.eq(t));
        }
        if let Some(c) = &self.carteirinha {
            cond = cond.add(divergencia::Column::Carteirinha.eq(c.clone()));
        }
        if let Some(n) = &self.numero_guia {
            cond = cond.add(divergencia::Column::NumeroGuia.eq(n.clone()));
        }
        if let Some(x) = self.data_inicio {
            cond = cond.add(divergencia::Column::DataIdentificacao.gte(x));
        }
        if let Some(x) = self.data_fim {
            cond = cond.add(divergencia::Column::DataIdentificacao.lte(x));
        }
        cond
    }
}

/// Body of `POST /api/divergencias/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DivergenciaStatusInput {
    #[serde(default)]
    pub divergencia_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub resolvido_por: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivergenciaStatusUpdate {
    pub divergencia_id: Uuid,
    pub status: DivergenciaStatus,
    pub resolvido_por: Option<String>,
}

impl DivergenciaStatusUpdate {
    pub fn parse(input: &DivergenciaStatusInput) -> Result<Self, ServiceError> {
        let raw_id = require("divergencia_id", input.divergencia_id.as_deref())?;
        let raw_status = require("status", input.status.as_deref())?;
        let status = DivergenciaStatus::parse(raw_status)?;
        let resolvido_por = owned_non_blank(input.resolvido_por.as_deref());
        if status == DivergenciaStatus::Resolvida && resolvido_por.is_none() {
            return Err(ServiceError::Validation("resolvido_por is required to resolve a divergence".into()));
        }
        if let Some(r) = &resolvido_por {
            limits::check_len("resolvido_por", r, limits::RESOLVIDO_POR)?;
        }
        Ok(Self { divergencia_id: require_uuid("divergencia_id", Some(raw_id))?, status, resolvido_por })
    }
}

/// Dashboard counters. Every known status and type is present, zero included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditoriaResumo {
    pub total: u64,
    pub por_status: BTreeMap<String, u64>,
    pub por_tipo: BTreeMap<String, u64>,
}

impl AuditoriaResumo {
    pub fn from_counts(
        por_status: impl IntoIterator<Item = (DivergenciaStatus, u64)>,
        por_tipo: impl IntoIterator<Item = (DivergenciaTipo, u64)>,
    ) -> Self {
        let mut out = AuditoriaResumo {
            total: 0,
            por_status: DivergenciaStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect(),
            por_tipo: DivergenciaTipo::ALL.iter().map(|t| (t.as_str().to_string(), 0)).collect(),
        };
        for (s, n) in por_status {
            *out.por_status.entry(s.as_str().to_string()).or_default() += n;
            out.total += n;
        }
        for (t, n) in por_tipo {
            *out.por_tipo.entry(t.as_str().to_string()).or_default() += n;
        }
        out
    }
}
