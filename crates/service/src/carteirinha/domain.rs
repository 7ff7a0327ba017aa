use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::carteirinha::{self, CarteirinhaStatus, NewCarteirinha};

use crate::errors::ServiceError;
use crate::input::{non_blank, optional_uuid, parse_date, require, require_uuid};

/// Body of `POST /api/carteirinhas`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCarteirinhaInput {
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub paciente_id: Option<String>,
    #[serde(default)]
    pub plano_saude_id: Option<String>,
    #[serde(default)]
    pub data_validade: Option<String>,
    #[serde(default)]
    pub titular: Option<bool>,
}

impl CreateCarteirinhaInput {
    pub fn parse(&self) -> Result<NewCarteirinha, ServiceError> {
        let numero = carteirinha::validate_numero(require("numero", self.numero.as_deref())?)?;
        Ok(NewCarteirinha {
            numero,
            paciente_id: require_uuid("paciente_id", self.paciente_id.as_deref())?,
            plano_saude_id: optional_uuid("plano_saude_id", self.plano_saude_id.as_deref())?,
            data_validade: parse_date("data_validade", self.data_validade.as_deref())?,
            titular: self.titular.unwrap_or(false),
        })
    }
}

/// Body of `PUT /api/carteirinhas/{id}`; absent or blank fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCarteirinhaInput {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_validade: Option<String>,
    #[serde(default)]
    pub titular: Option<bool>,
    #[serde(default)]
    pub plano_saude_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarteirinhaChanges {
    pub status: Option<CarteirinhaStatus>,
    pub data_validade: Option<NaiveDate>,
    pub titular: Option<bool>,
    pub plano_saude_id: Option<Uuid>,
}

impl CarteirinhaChanges {
    pub fn parse(input: &UpdateCarteirinhaInput) -> Result<Self, ServiceError> {
        Ok(Self {
            status: non_blank(input.status.as_deref()).map(CarteirinhaStatus::parse).transpose()?,
            data_validade: parse_date("data_validade", input.data_validade.as_deref())?,
            titular: input.titular,
            plano_saude_id: optional_uuid("plano_saude_id", input.plano_saude_id.as_deref())?,
        })
    }

    pub fn is_empty(&self) -> bool { *self == Self::default() }

    pub fn apply(&self, m: &mut carteirinha::Model) {
        if let Some(s) = self.status { m.status = s; }
        if let Some(d) = self.data_validade { m.data_validade = Some(d); }
        if let Some(t) = self.titular { m.titular = t; }
        if let Some(p) = self.plano_saude_id { m.plano_saude_id = Some(p); }
    }
}

/// Query string of `GET /api/carteirinhas`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCarteirinhasQuery {
    #[serde(default)]
    pub paciente_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarteirinhaFiltro {
    pub paciente_id: Option<Uuid>,
    pub status: Option<CarteirinhaStatus>,
}

impl CarteirinhaFiltro {
    pub fn parse(q: &ListCarteirinhasQuery) -> Result<Self, ServiceError> {
        Ok(Self {
            paciente_id: optional_uuid("paciente_id", q.paciente_id.as_deref())?,
            status: non_blank(q.status.as_deref()).map(CarteirinhaStatus::parse).transpose()?,
        })
    }

    pub fn matches(&self, c: &carteirinha::Model) -> bool {
        self.paciente_id.map_or(true, |p| c.paciente_id == p) && self.status.map_or(true, |s| c.status == s)
    }
}

/// A card as served by the API, with its validity on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarteirinhaView {
    #[serde(flatten)]
    pub carteirinha: carteirinha::Model,
    /// Active and not past `data_validade`.
    pub vigente: bool,
}

impl CarteirinhaView {
    pub fn em(carteirinha: carteirinha::Model, dia: NaiveDate) -> Self {
        let vigente = carteirinha.is_vigente(dia);
        Self { carteirinha, vigente }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_numero_and_patient() {
        let err = CreateCarteirinhaInput { paciente_id: Some(Uuid::new_v4().to_string()), ..Default::default() }.parse();
        assert!(matches!(err, Err(ServiceError::Validation(m)) if m.contains("numero")));
        let err = CreateCarteirinhaInput { numero: Some("123".into()), ..Default::default() }.parse();
        assert!(matches!(err, Err(ServiceError::Validation(m)) if m.contains("paciente_id")));
        let err = CreateCarteirinhaInput {
            numero: Some("12x".into()),
            paciente_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        }
        .parse();
        assert!(matches!(err, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn changes_apply_only_present_fields() {
        let mut m = carteirinha::new_model(NewCarteirinha {
            numero: "1".into(),
            paciente_id: Uuid::new_v4(),
            plano_saude_id: None,
            data_validade: None,
            titular: true,
        })
        .unwrap();
        let before = m.clone();
        let empty = CarteirinhaChanges::parse(&UpdateCarteirinhaInput { status: Some(" ".into()), ..Default::default() })
            .unwrap();
        assert!(empty.is_empty());
        empty.apply(&mut m);
        assert_eq!(m, before);

        let c = CarteirinhaChanges::parse(&UpdateCarteirinhaInput {
            status: Some("inativa".into()),
            data_validade: Some("2025-12-31".into()),
            ..Default::default()
        })
        .unwrap();
        c.apply(&mut m);
        assert_eq!(m.status, CarteirinhaStatus::Inativa);
        assert_eq!(m.data_validade, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert!(m.titular);
    }

    #[test]
    fn view_flattens_card_and_flags_validity() {
        let c = carteirinha::new_model(NewCarteirinha {
            numero: "77".into(),
            paciente_id: Uuid::new_v4(),
            plano_saude_id: None,
            data_validade: NaiveDate::from_ymd_opt(2024, 6, 30),
            titular: false,
        })
        .unwrap();
        let antes = CarteirinhaView::em(c.clone(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(antes.vigente);
        let depois = CarteirinhaView::em(c, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert!(!depois.vigente);

        let json = serde_json::to_value(&depois).unwrap();
        assert_eq!(json["numero"], "77");
        assert_eq!(json["vigente"], false);
    }
}
