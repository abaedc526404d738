//! Setting value validation against the schema.

use crate::{SettingKey, SettingKind, SettingValue, definition};

/// A value failed the schema's type, bounds, or enum check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{key}: expected a {expected} value, got {got}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{key}: must be between {min} and {max}")]
    OutOfRange { key: &'static str, min: f64, max: f64 },

    #[error("{key}: must be one of {options:?}")]
    NotAnOption {
        key: &'static str,
        options: &'static [&'static str],
    },
}

/// Validate a value against the definition for `key`.
pub fn validate(key: SettingKey, value: &SettingValue) -> Result<(), ValidationError> {
    let def = definition(key);
    match def.kind {
        SettingKind::Boolean => {
            if value.as_bool().is_none() {
                return Err(wrong_type(key, "boolean", value));
            }
        }
        SettingKind::Number => {
            let n = value.as_f64().ok_or_else(|| wrong_type(key, "number", value))?;
            if !n.is_finite() {
                return Err(wrong_type(key, "number", value));
            }
            let min = def.min.unwrap_or(f64::MIN);
            let max = def.max.unwrap_or(f64::MAX);
            if n < min || n > max {
                return Err(ValidationError::OutOfRange { key: key.path(), min, max });
            }
        }
        SettingKind::String => {
            if value.as_str().is_none() {
                return Err(wrong_type(key, "string", value));
            }
        }
        SettingKind::Enum => {
            let s = value.as_str().ok_or_else(|| wrong_type(key, "string", value))?;
            if !def.options.contains(&s) {
                return Err(ValidationError::NotAnOption {
                    key: key.path(),
                    options: def.options,
                });
            }
        }
    }
    Ok(())
}

fn wrong_type(key: SettingKey, expected: &'static str, got: &SettingValue) -> ValidationError {
    ValidationError::WrongType {
        key: key.path(),
        expected,
        got: got.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_bounds() {
        let key = SettingKey::EditorFontSize;
        assert!(validate(key, &SettingValue::Number(14.0)).is_ok());
        assert!(validate(key, &SettingValue::Number(10.0)).is_ok());
        assert!(validate(key, &SettingValue::Number(24.0)).is_ok());
        assert!(matches!(
            validate(key, &SettingValue::Number(99.0)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate(key, &SettingValue::Number(9.5)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_number_rejects_non_finite() {
        assert!(validate(SettingKey::EditorFontSize, &SettingValue::Number(f64::NAN)).is_err());
        assert!(
            validate(SettingKey::EditorFontSize, &SettingValue::Number(f64::INFINITY)).is_err()
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            validate(SettingKey::EditorFontSize, &SettingValue::String("14".into())),
            Err(ValidationError::WrongType { .. })
        ));
        assert!(matches!(
            validate(SettingKey::EditorWordWrap, &SettingValue::Number(1.0)),
            Err(ValidationError::WrongType { .. })
        ));
        assert!(matches!(
            validate(SettingKey::AdvancedPreviewToken, &SettingValue::Bool(true)),
            Err(ValidationError::WrongType { .. })
        ));
    }

    #[test]
    fn test_enum_membership() {
        let key = SettingKey::EditorTheme;
        assert!(validate(key, &SettingValue::String("vs-dark".into())).is_ok());
        assert!(validate(key, &SettingValue::String("hc-black".into())).is_ok());
        assert!(matches!(
            validate(key, &SettingValue::String("solarized".into())),
            Err(ValidationError::NotAnOption { .. })
        ));
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = validate(SettingKey::EditorFontSize, &SettingValue::Number(99.0)).unwrap_err();
        assert!(err.to_string().contains("editor.fontSize"));
    }
}
