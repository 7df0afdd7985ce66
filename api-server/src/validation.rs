use lazy_static::lazy_static;
use regex::Regex;
use request_coordinator::NewUser;
use serde_json::Value;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref LEADING_DIGITS: Regex = Regex::new(r"^\s*(\d+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid user ID")]
    InvalidUserId,
    #[error("Name and email are required")]
    MissingFields,
    #[error("Name and email must be strings")]
    NotStrings,
    #[error("Invalid email format")]
    InvalidEmail,
}

/// Read the leading decimal digits of `raw`; trailing garbage is ignored.
pub fn parse_user_id(raw: &str) -> Result<u64, ValidationError> {
    LEADING_DIGITS
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or(ValidationError::InvalidUserId)
}

/// Empty strings, `null`, `false` and `0` count as missing.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub fn validate_new_user(body: &Value) -> Result<NewUser, ValidationError> {
    let name = body.get("name");
    let email = body.get("email");

    if !is_present(name) || !is_present(email) {
        return Err(ValidationError::MissingFields);
    }

    let (Some(Value::String(name)), Some(Value::String(email))) = (name, email) else {
        return Err(ValidationError::NotStrings);
    };

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(NewUser {
        name: name.clone(),
        email: email.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("42"), Ok(42));
        assert_eq!(parse_user_id("abc"), Err(ValidationError::InvalidUserId));
        assert_eq!(parse_user_id("-1"), Err(ValidationError::InvalidUserId));
        assert_eq!(parse_user_id(""), Err(ValidationError::InvalidUserId));
    }

    #[test]
    fn test_parse_user_id_ignores_trailing_characters() {
        assert_eq!(parse_user_id("1abc"), Ok(1));
        assert_eq!(parse_user_id("007"), Ok(7));
        assert_eq!(parse_user_id("12.5"), Ok(12));
        assert_eq!(parse_user_id("abc1"), Err(ValidationError::InvalidUserId));
        assert_eq!(
            parse_user_id("99999999999999999999999"),
            Err(ValidationError::InvalidUserId)
        );
    }

    #[test]
    fn test_valid_user() {
        let user = validate_new_user(&json!({"name": "Bob", "email": "bob@example.com"})).unwrap();
        assert_eq!(user.name, "Bob");
        assert_eq!(user.email, "bob@example.com");
    }

    #[test]
    fn test_missing_fields() {
        for body in [
            json!({"name": "Bob"}),
            json!({"email": "bob@example.com"}),
            json!({"name": "", "email": "bob@example.com"}),
            json!({"name": null, "email": "bob@example.com"}),
            json!({}),
        ] {
            assert_eq!(validate_new_user(&body), Err(ValidationError::MissingFields));
        }
    }

    #[test]
    fn test_non_string_fields() {
        let body = json!({"name": 12, "email": "bob@example.com"});
        assert_eq!(validate_new_user(&body), Err(ValidationError::NotStrings));
        let body = json!({"name": "Bob", "email": ["bob@example.com"]});
        assert_eq!(validate_new_user(&body), Err(ValidationError::NotStrings));
    }

    #[test]
    fn test_invalid_email() {
        for email in ["bob", "bob@example", "bob @example.com", "@example.com"] {
            let body = json!({"name": "Bob", "email": email});
            assert_eq!(validate_new_user(&body), Err(ValidationError::InvalidEmail));
        }
    }
}
