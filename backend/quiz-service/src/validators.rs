use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

/// Input shape rules shared by the request DTOs

// Hardcoded patterns; a panic here means the source is wrong.
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]{4,20}$").expect("hardcoded username regex is invalid - fix source code")
});

static NICKNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z가-힣]{2,10}$")
        .expect("hardcoded nickname regex is invalid - fix source code")
});

fn with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// 4-20 lowercase letters or digits
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(with_message(
            "username",
            "username must be 4-20 lowercase letters or digits",
        ))
    }
}

/// 8-16 characters with at least one letter and one digit
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if (8..=16).contains(&len) && has_letter && has_digit {
        Ok(())
    } else {
        Err(with_message(
            "password",
            "password must be 8-16 characters and contain letters and digits",
        ))
    }
}

/// 2-10 characters without special characters
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if NICKNAME_REGEX.is_match(nickname) {
        Ok(())
    } else {
        Err(with_message(
            "nickname",
            "nickname must be 2-10 characters without special characters",
        ))
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(with_message("blank", "must not be blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("quiz01").is_ok());
        assert!(validate_username("abc").is_err());
        assert!(validate_username("Quiz01").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("abcd1234").is_ok());
        assert!(validate_password("abcdefgh").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("ab1").is_err());
        assert!(validate_password("abcdefgh123456789").is_err());
    }

    #[test]
    fn nicknames() {
        assert!(validate_nickname("퀴즈왕").is_ok());
        assert!(validate_nickname("q").is_err());
        assert!(validate_nickname("bad name!").is_err());
    }

    #[test]
    fn blanks() {
        assert!(validate_not_blank("  ").is_err());
        assert!(validate_not_blank(" x ").is_ok());
    }
}
