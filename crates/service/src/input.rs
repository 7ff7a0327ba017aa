//! Parsing helpers for loosely-typed request fields.
//!
//! Forms post empty strings for untouched inputs; those count as absent.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::ServiceError;

pub fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

pub fn owned_non_blank(v: Option<&str>) -> Option<String> {
    non_blank(v).map(str::to_string)
}

/// `YYYY-MM-DD`; blank means absent.
pub fn parse_date(field: &str, v: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    match non_blank(v) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ServiceError::Validation(format!("{field} must be a date in YYYY-MM-DD format"))),
    }
}

/// Required UUID field.
pub fn require_uuid(field: &str, v: Option<&str>) -> Result<Uuid, ServiceError> {
    let s = non_blank(v).ok_or_else(|| ServiceError::Validation(format!("{field} is required")))?;
    Uuid::parse_str(s).map_err(|_| ServiceError::Validation(format!("{field} must be a valid UUID")))
}

pub fn optional_uuid(field: &str, v: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
    match non_blank(v) {
        None => Ok(None),
        Some(_) => require_uuid(field, v).map(Some),
    }
}

pub fn require<'a>(field: &str, v: Option<&'a str>) -> Result<&'a str, ServiceError> {
    non_blank(v).ok_or_else(|| ServiceError::Validation(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" x ")), Some("x"));
        assert_eq!(parse_date("d", Some("")).unwrap(), None);
        assert!(require("status", Some(" ")).is_err());
    }

    #[test]
    fn dates_and_uuids() {
        assert_eq!(
            parse_date("d", Some("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_date("d", Some("29/02/2024")).is_err());
        assert!(parse_date("d", Some("2023-02-29")).is_err());
        let id = Uuid::new_v4();
        assert_eq!(require_uuid("id", Some(&id.to_string())).unwrap(), id);
        assert!(require_uuid("id", Some("abc")).is_err());
        assert!(require_uuid("id", None).is_err());
        assert_eq!(optional_uuid("id", Some("")).unwrap(), None);
    }
}
