//! Input shape checks for account fields.

use crate::AuthError;

/// Structural email check: `local@domain.tld`.
///
/// The local part allows `[A-Za-z0-9._%+-]`, the domain `[A-Za-z0-9.-]` and
/// must end in a dot followed by at least two ASCII letters.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
    {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Reject empty required fields, naming the first one missing.
pub(crate) fn require_non_empty(fields: &[(&str, &str)]) -> Result<(), AuthError> {
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(AuthError::Validation(format!("{name} is required"))),
        None => Ok(()),
    }
}

pub(crate) fn require_valid_email(email: &str) -> Result<(), AuthError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("invalid email format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(is_valid_email("a_b%c-d@sub-domain.io"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@domain"));
        assert!(!is_valid_email("user@domain.c"));
        assert!(!is_valid_email("user@domain.c0m"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty(&[("name", "Ann"), ("email", "a@b.io")]).is_ok());
        let err = require_non_empty(&[("name", "Ann"), ("password", "")]).unwrap_err();
        assert_eq!(err.to_string(), "password is required");
    }
}
