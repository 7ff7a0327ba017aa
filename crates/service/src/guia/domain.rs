use chrono::NaiveDate;
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::guia::{self, GuiaStatus};

use crate::errors::ServiceError;
use crate::input::{non_blank, owned_non_blank, parse_date, require, require_uuid};

/// Filters as posted by the listing screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuiaFiltersInput {
    #[serde(default)]
    pub numero_guia: Option<String>,
    #[serde(default)]
    pub carteira: Option<String>,
    #[serde(default)]
    pub data_inicio: Option<String>,
    #[serde(default)]
    pub data_fim: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /api/unimed/guias`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListGuiasInput {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub filters: Option<GuiaFiltersInput>,
}

/// Parsed filters; every present field is ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiaFiltro {
    pub numero_guia: Option<String>,
    pub carteira: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub status: Option<GuiaStatus>,
}

impl GuiaFiltro {
    pub fn parse(input: &GuiaFiltersInput) -> Result<Self, ServiceError> {
        let status = match non_blank(input.status.as_deref()) {
            Some(s) => Some(GuiaStatus::parse(s)?),
            None => None,
        };
        Ok(Self {
            numero_guia: owned_non_blank(input.numero_guia.as_deref()),
            carteira: owned_non_blank(input.carteira.as_deref()),
            data_inicio: parse_date("data_inicio", input.data_inicio.as_deref())?,
            data_fim: parse_date("data_fim", input.data_fim.as_deref())?,
            status,
        })
    }

    /// In-memory evaluation of the same predicates as [`GuiaFiltro::condition`].
    pub fn matches(&self, g: &guia::Model) -> bool {
        self.numero_guia.as_ref().map_or(true, |n| &g.numero_guia == n)
            && self.carteira.as_ref().map_or(true, |c| &g.paciente_carteirinha == c)
            && self.data_inicio.map_or(true, |d| g.data_atendimento >= d)
            && self.data_fim.map_or(true, |d| g.data_atendimento <= d)
            && self.status.map_or(true, |s| g.status == s)
    }

    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(n) = &self.numero_guia {
            cond = cond.add(guia::Column::NumeroGuia.eq(n.clone()));
        }
        if let Some(c) = &self.carteira {
            cond = cond.add(guia::Column::PacienteCarteirinha.eq(c.clone()));
        }
        if let Some(d) = self.data_inicio {
            cond = cond.add(guia::Column::DataAtendimento.gte(d));
        }
        if let Some(d) = self.data_fim {
            cond = cond.add(guia::Column::DataAtendimento.lte(d));
        }
        if let Some(s) = self.status {
            cond = cond.add(guia::Column::Status.eq(s));
        }
        cond
    }
}

/// Body of `POST /api/unimed/guias/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdateInput {
    #[serde(default)]
    pub guia_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_execucao: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub guia_id: Uuid,
    pub status: GuiaStatus,
    pub data_execucao: Option<NaiveDate>,
}

impl StatusUpdate {
    pub fn parse(input: &StatusUpdateInput) -> Result<Self, ServiceError> {
        // presence is checked before format so a missing field reads as such
        let raw_id = require("guia_id", input.guia_id.as_deref())?;
        let raw_status = require("status", input.status.as_deref())?;
        Ok(Self {
            guia_id: require_uuid("guia_id", Some(raw_id))?,
            status: GuiaStatus::parse(raw_status)?,
            data_execucao: parse_date("data_execucao", input.data_execucao.as_deref())?,
        })
    }
}
