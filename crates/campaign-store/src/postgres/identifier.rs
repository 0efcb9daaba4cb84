use crate::error::StoreError;

/// Validate a caller-influenced SQL identifier (table/column name), directly
/// grounded on `dashflow-postgres-checkpointer::validate_identifier`: must
/// start with a letter or underscore, contain only alphanumerics/underscore,
/// and be at most 63 bytes (PostgreSQL's unquoted identifier limit).
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }
    if name.len() > 63 {
        return Err(StoreError::InvalidIdentifier(format!(
            "identifier '{name}' exceeds maximum length of 63 characters"
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().expect("non-empty checked above");
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(StoreError::InvalidIdentifier(format!(
            "identifier '{name}' must start with a letter or underscore"
        )));
    }
    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(StoreError::InvalidIdentifier(format!(
                "identifier '{name}' contains invalid character '{c}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"x".repeat(64)).is_err());
    }

    #[test]
    fn rejects_non_letter_start_and_bad_chars() {
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("table;drop").is_err());
    }

    #[test]
    fn accepts_normal_identifiers() {
        assert!(validate_identifier("campaign_phase_executions").is_ok());
        assert!(validate_identifier("_leading_underscore").is_ok());
    }
}
