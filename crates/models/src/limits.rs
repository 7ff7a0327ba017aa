//! Column widths of the VARCHAR columns, mirrored from the migrations.
//! Inputs longer than these are rejected before reaching the database.

use crate::errors::ModelError;

pub const NUMERO_GUIA: usize = 64;
pub const CARTEIRINHA: usize = 64;
pub const PACIENTE_NOME: usize = 256;
pub const CODIGO_FICHA: usize = 64;
pub const ARQUIVO: usize = 512;
pub const RESOLVIDO_POR: usize = 256;

/// Counts characters, as Postgres does for `VARCHAR(n)`.
pub fn check_len(field: &str, value: &str, max: usize) -> Result<(), ModelError> {
    if value.chars().count() > max {
        return Err(ModelError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        assert!(check_len("numero_guia", &"9".repeat(NUMERO_GUIA), NUMERO_GUIA).is_ok());
        assert!(check_len("numero_guia", &"9".repeat(NUMERO_GUIA + 1), NUMERO_GUIA).is_err());
        // 64 two-byte characters still fit
        assert!(check_len("paciente_nome", &"é".repeat(64), 64).is_ok());
    }
}
