//! Tenant and resource name validation.
//!
//! Names end up in manifest metadata, file names and command lines, so they
//! are restricted to ASCII alphanumerics plus `-`, `_` and `.`, starting and
//! ending with an alphanumeric. No separators, quotes or whitespace.

/// Maximum length of a label.
pub const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("'{field}' must not be empty")]
    Empty { field: String },

    #[error("'{field}' is longer than 63 characters")]
    TooLong { field: String },

    #[error("'{field}' value '{value}' must consist of alphanumerics, '-', '_' or '.', and start and end with an alphanumeric")]
    InvalidCharacters { field: String, value: String },
}

/// Check that `value` is a valid label for `field`.
pub fn validate_name(field: &str, value: &str) -> Result<(), NameError> {
    if value.is_empty() {
        return Err(NameError::Empty {
            field: field.to_string(),
        });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong {
            field: field.to_string(),
        });
    }

    let edge = |c: char| c.is_ascii_alphanumeric();
    let inner = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !value.starts_with(edge) || !value.ends_with(edge) || !value.chars().all(inner) {
        return Err(NameError::InvalidCharacters {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_labels() {
        assert!(validate_name("name", "team-a").is_ok());
        assert!(validate_name("name", "vm1").is_ok());
        assert!(validate_name("name", "a").is_ok());
        assert!(validate_name("name", "teamA").is_ok());
        assert!(validate_name("name", "web_1.internal").is_ok());
    }

    #[test]
    fn test_rejects_bad_labels() {
        assert!(matches!(validate_name("name", ""), Err(NameError::Empty { .. })));
        assert!(matches!(
            validate_name("name", "team a"),
            Err(NameError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_name("name", "../etc"),
            Err(NameError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_name("name", "-vm"),
            Err(NameError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_name("name", "vm;rm -rf"),
            Err(NameError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_name("name", &"a".repeat(64)),
            Err(NameError::TooLong { .. })
        ));
    }
}
