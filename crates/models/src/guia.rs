//! Insurer guides (`guias_unimed`).
//!
//! Rows are imported by the ingestion pipeline; afterwards only the status
//! workflow touches them.

use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{divergencia, errors, limits};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GuiaStatus {
    #[sea_orm(string_value = "pendente")]
    Pendente,
    #[sea_orm(string_value = "processado")]
    Processado,
    #[sea_orm(string_value = "erro")]
    Erro,
}

impl GuiaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuiaStatus::Pendente => "pendente",
            GuiaStatus::Processado => "processado",
            GuiaStatus::Erro => "erro",
        }
    }

    /// Parse the wire value; surrounding whitespace and case are ignored.
    pub fn parse(s: &str) -> Result<Self, errors::ModelError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pendente" => Ok(GuiaStatus::Pendente),
            "processado" => Ok(GuiaStatus::Processado),
            "erro" => Ok(GuiaStatus::Erro),
            other => Err(errors::ModelError::Validation(format!("unknown guide status '{other}'"))),
        }
    }

    /// Targets reachable from this status, excluding the status itself.
    pub fn valid_transitions(&self) -> &'static [GuiaStatus] {
        match self {
            GuiaStatus::Pendente => &[GuiaStatus::Processado, GuiaStatus::Erro],
            GuiaStatus::Erro => &[GuiaStatus::Pendente, GuiaStatus::Processado],
            GuiaStatus::Processado => &[],
        }
    }

    /// Re-applying the current status is accepted so a retry can still set
    /// the execution date.
    pub fn can_transition_to(&self, target: GuiaStatus) -> Result<(), errors::ModelError> {
        if *self == target || self.valid_transitions().contains(&target) {
            return Ok(());
        }
        Err(errors::ModelError::InvalidTransition(format!(
            "guide cannot move from {} to {}",
            self.as_str(),
            target.as_str()
        )))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guias_unimed")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero_guia: String,
    pub paciente_nome: String,
    pub paciente_carteirinha: String,
    pub data_atendimento: Date,
    pub data_execucao: Option<Date>,
    pub status: GuiaStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Divergencia }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Divergencia => Entity::has_many(divergencia::Entity).into(),
        }
    }
}

impl Related<divergencia::Entity> for Entity {
    fn to() -> RelationDef { Relation::Divergencia.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields supplied by the importer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewGuia {
    pub numero_guia: String,
    pub paciente_nome: String,
    pub paciente_carteirinha: String,
    pub data_atendimento: Date,
    pub status: GuiaStatus,
}

pub fn validate_new(input: &NewGuia) -> Result<(), errors::ModelError> {
    if input.numero_guia.trim().is_empty() {
        return Err(errors::ModelError::Validation("numero_guia required".into()));
    }
    if input.paciente_carteirinha.trim().is_empty() {
        return Err(errors::ModelError::Validation("paciente_carteirinha required".into()));
    }
    if input.paciente_nome.trim().is_empty() {
        return Err(errors::ModelError::Validation("paciente_nome required".into()));
    }
    limits::check_len("numero_guia", input.numero_guia.trim(), limits::NUMERO_GUIA)?;
    limits::check_len("paciente_carteirinha", input.paciente_carteirinha.trim(), limits::CARTEIRINHA)?;
    limits::check_len("paciente_nome", input.paciente_nome.trim(), limits::PACIENTE_NOME)?;
    Ok(())
}

/// Build an unsaved row with fresh id and timestamps.
pub fn new_model(input: NewGuia) -> Result<Model, errors::ModelError> {
    validate_new(&input)?;
    let now = Utc::now().into();
    Ok(Model {
        id: Uuid::new_v4(),
        numero_guia: input.numero_guia.trim().to_string(),
        paciente_nome: input.paciente_nome.trim().to_string(),
        paciente_carteirinha: input.paciente_carteirinha.trim().to_string(),
        data_atendimento: input.data_atendimento,
        data_execucao: None,
        status: input.status,
        created_at: now,
        updated_at: now,
    })
}

pub async fn create(db: &DatabaseConnection, input: NewGuia) -> Result<Model, errors::ModelError> {
    let m = new_model(input)?;
    let am = ActiveModel {
        id: Set(m.id),
        numero_guia: Set(m.numero_guia),
        paciente_nome: Set(m.paciente_nome),
        paciente_carteirinha: Set(m.paciente_carteirinha),
        data_atendimento: Set(m.data_atendimento),
        data_execucao: Set(m.data_execucao),
        status: Set(m.status),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!(GuiaStatus::parse(" Processado ").unwrap(), GuiaStatus::Processado);
        assert_eq!(GuiaStatus::parse("erro").unwrap(), GuiaStatus::Erro);
        assert!(matches!(GuiaStatus::parse("cancelado"), Err(errors::ModelError::Validation(_))));
        assert!(GuiaStatus::parse("").is_err());
    }

    #[test]
    fn transition_table() {
        use GuiaStatus::*;
        assert!(Pendente.can_transition_to(Processado).is_ok());
        assert!(Pendente.can_transition_to(Erro).is_ok());
        assert!(Erro.can_transition_to(Pendente).is_ok());
        assert!(Erro.can_transition_to(Processado).is_ok());
        assert!(matches!(
            Processado.can_transition_to(Pendente),
            Err(errors::ModelError::InvalidTransition(_))
        ));
        assert!(Processado.can_transition_to(Erro).is_err());
    }

    #[test]
    fn same_status_is_idempotent() {
        for s in [GuiaStatus::Pendente, GuiaStatus::Processado, GuiaStatus::Erro] {
            assert!(s.can_transition_to(s).is_ok());
            assert!(!s.valid_transitions().contains(&s));
        }
    }

    #[test]
    fn serde_uses_lowercase_wire_values() {
        let v = serde_json::to_value(GuiaStatus::Processado).unwrap();
        assert_eq!(v, "processado");
        let back: GuiaStatus = serde_json::from_value(serde_json::json!("erro")).unwrap();
        assert_eq!(back, GuiaStatus::Erro);
    }

    #[test]
    fn new_model_trims_and_requires_fields() {
        let d = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let m = new_model(NewGuia {
            numero_guia: " 123 ".into(),
            paciente_nome: "Ana".into(),
            paciente_carteirinha: "0064.0001".into(),
            data_atendimento: d,
            status: GuiaStatus::Pendente,
        })
        .unwrap();
        assert_eq!(m.numero_guia, "123");
        assert_eq!(m.created_at, m.updated_at);
        assert!(m.data_execucao.is_none());

        let err = new_model(NewGuia {
            numero_guia: "  ".into(),
            paciente_nome: "Ana".into(),
            paciente_carteirinha: "1".into(),
            data_atendimento: d,
            status: GuiaStatus::Pendente,
        });
        assert!(err.is_err());

        let err = new_model(NewGuia {
            numero_guia: "9".repeat(limits::NUMERO_GUIA + 1),
            paciente_nome: "Ana".into(),
            paciente_carteirinha: "1".into(),
            data_atendimento: d,
            status: GuiaStatus::Pendente,
        });
        assert!(matches!(err, Err(errors::ModelError::Validation(_))));
    }
}
