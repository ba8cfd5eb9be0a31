//! Validation helpers for DTOs.

use serde_json::Value;
use validator::{ValidationError, ValidationErrors};

/// Validates a reference to a player inside a match record.
///
/// Accepts either a non-blank storage id or an inline player object carrying a non-blank
/// `id` or `nombre`.
///
/// # Examples
///
/// ```ignore
/// validate_player_reference(&json!("p1"))                  // Ok
/// validate_player_reference(&json!({"nombre": "Carlos"}))  // Ok
/// validate_player_reference(&json!("  "))                  // Err - blank
/// validate_player_reference(&json!(7))                     // Err - wrong type
/// ```
pub fn validate_player_reference(value: &Value) -> Result<(), ValidationError> {
    let valid = match value {
        Value::String(id) => !id.trim().is_empty(),
        Value::Object(player) => ["id", "nombre"].iter().any(|key| {
            player
                .get(*key)
                .and_then(Value::as_str)
                .is_some_and(|text| !text.trim().is_empty())
        }),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("player_reference");
        err.message =
            Some("Player must be an id or an object with a non-empty `id` or `nombre`".into());
        Err(err)
    }
}

/// Validates that a value carries information: not null and, for strings, arrays and
/// objects, not empty.
pub fn validate_present(value: &Value) -> Result<(), ValidationError> {
    let present = match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    };

    if present {
        Ok(())
    } else {
        let mut err = ValidationError::new("required");
        err.message = Some("Value must not be empty".into());
        Err(err)
    }
}

/// Record a `required` error for `field` when `value` is missing, otherwise run `check` on it.
pub fn require_with(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&Value>,
    check: fn(&Value) -> Result<(), ValidationError>,
) {
    let outcome = match value {
        Some(value) => check(value),
        None => Err(ValidationError::new("required")),
    };
    if let Err(err) = outcome {
        errors.add(field, err);
    }
}

/// Record a `required` error for `field` when `value` is missing or blank.
pub fn require_text(errors: &mut ValidationErrors, field: &'static str, value: Option<&str>) {
    if value.is_none_or(|text| text.trim().is_empty()) {
        errors.add(field, ValidationError::new("required"));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_player_reference_valid() {
        assert!(validate_player_reference(&json!("p1")).is_ok());
        assert!(validate_player_reference(&json!({"id": "p1"})).is_ok());
        assert!(validate_player_reference(&json!({"nombre": "Carlos", "ranking": 2})).is_ok());
    }

    #[test]
    fn test_validate_player_reference_invalid() {
        assert!(validate_player_reference(&json!("")).is_err());
        assert!(validate_player_reference(&json!("   ")).is_err());
        assert!(validate_player_reference(&json!({"ranking": 2})).is_err());
        assert!(validate_player_reference(&json!({"nombre": ""})).is_err());
        assert!(validate_player_reference(&json!(null)).is_err());
        assert!(validate_player_reference(&json!(42)).is_err());
    }

    #[test]
    fn test_require_helpers_collect_errors() {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "torneo", Some(" "));
        require_with(&mut errors, "jugador1", None, validate_player_reference);
        require_with(&mut errors, "jugador2", Some(&json!("p2")), validate_player_reference);

        let fields = errors.field_errors();
        assert!(fields.contains_key("torneo"));
        assert!(fields.contains_key("jugador1"));
        assert!(!fields.contains_key("jugador2"));
    }

    #[test]
    fn test_validate_present() {
        assert!(validate_present(&json!("6-4 6-3")).is_ok());
        assert!(validate_present(&json!({"sets": [[6, 4]]})).is_ok());
        assert!(validate_present(&json!(0)).is_ok());
        assert!(validate_present(&json!(null)).is_err());
        assert!(validate_present(&json!("")).is_err());
        assert!(validate_present(&json!([])).is_err());
        assert!(validate_present(&json!({})).is_err());
    }
}
