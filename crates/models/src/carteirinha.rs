use sea_orm::entity::prelude::*;
use uuid::Uuid;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors, limits};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CarteirinhaStatus {
    #[sea_orm(string_value = "ativa")]
    Ativa,
    #[sea_orm(string_value = "inativa")]
    Inativa,
}

impl CarteirinhaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarteirinhaStatus::Ativa => "ativa",
            CarteirinhaStatus::Inativa => "inativa",
        }
    }

    pub fn parse(s: &str) -> Result<Self, errors::ModelError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ativa" => Ok(CarteirinhaStatus::Ativa),
            "inativa" => Ok(CarteirinhaStatus::Inativa),
            other => Err(errors::ModelError::Validation(format!("unknown card status '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carteirinhas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub numero: String,
    pub paciente_id: Uuid,
    pub plano_saude_id: Option<Uuid>,
    pub data_validade: Option<Date>,
    pub status: CarteirinhaStatus,
    pub titular: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Active and not past its validity date.
    pub fn is_vigente(&self, today: NaiveDate) -> bool {
        self.status == CarteirinhaStatus::Ativa && self.data_validade.map_or(true, |v| v >= today)
    }
}

/// Card numbers are printed as digit groups; dots, dashes and spaces are kept.
pub fn validate_numero(numero: &str) -> Result<String, errors::ModelError> {
    let n = numero.trim();
    if n.is_empty() {
        return Err(errors::ModelError::Validation("numero required".into()));
    }
    if !n.chars().any(|c| c.is_ascii_digit()) {
        return Err(errors::ModelError::Validation("numero must contain digits".into()));
    }
    if !n.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | ' ')) {
        return Err(errors::ModelError::Validation("numero may only contain digits, '.', '-' or spaces".into()));
    }
    limits::check_len("numero", n, limits::CARTEIRINHA)?;
    Ok(n.to_string())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCarteirinha {
    pub numero: String,
    pub paciente_id: Uuid,
    #[serde(default)]
    pub plano_saude_id: Option<Uuid>,
    #[serde(default)]
    pub data_validade: Option<Date>,
    #[serde(default)]
    pub titular: bool,
}

pub fn new_model(input: NewCarteirinha) -> Result<Model, errors::ModelError> {
    let numero = validate_numero(&input.numero)?;
    let now = Utc::now().into();
    Ok(Model {
        id: Uuid::new_v4(),
        numero,
        paciente_id: input.paciente_id,
        plano_saude_id: input.plano_saude_id,
        data_validade: input.data_validade,
        status: CarteirinhaStatus::Ativa,
        titular: input.titular,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(validade: Option<NaiveDate>, status: CarteirinhaStatus) -> Model {
        let mut m = new_model(NewCarteirinha {
            numero: "0 064 000123456789 0".into(),
            paciente_id: Uuid::new_v4(),
            plano_saude_id: None,
            data_validade: validade,
            titular: true,
        })
        .unwrap();
        m.status = status;
        m
    }

    #[test]
    fn validity_respects_status_and_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        assert!(card(None, CarteirinhaStatus::Ativa).is_vigente(today));
        assert!(card(Some(today), CarteirinhaStatus::Ativa).is_vigente(today));
        assert!(!card(Some(yesterday), CarteirinhaStatus::Ativa).is_vigente(today));
        assert!(!card(None, CarteirinhaStatus::Inativa).is_vigente(today));
    }

    #[test]
    fn numero_validation() {
        assert_eq!(validate_numero(" 0064.0001-2 ").unwrap(), "0064.0001-2");
        assert!(validate_numero("").is_err());
        assert!(validate_numero("---").is_err());
        assert!(validate_numero("12a4").is_err());
        assert!(validate_numero(&"1".repeat(64)).is_ok());
        assert!(matches!(validate_numero(&"1".repeat(65)), Err(errors::ModelError::Validation(_))));
    }

    #[test]
    fn new_cards_start_active() {
        let c = card(None, CarteirinhaStatus::Ativa);
        assert_eq!(c.status, CarteirinhaStatus::Ativa);
        assert_eq!(CarteirinhaStatus::parse("INATIVA").unwrap(), CarteirinhaStatus::Inativa);
    }
}
