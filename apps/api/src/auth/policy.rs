use email_address::EmailAddress;

use crate::errors::{AppError, FieldError};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
const MAX_NAME_LEN: usize = 100;

/// Trims and lower-cases an email, rejecting anything that is not an address.
pub fn normalize_email(raw: &str) -> Result<String, FieldError> {
    let email = raw.trim().to_lowercase();
    if EmailAddress::is_valid(&email) {
        Ok(email)
    } else {
        Err(FieldError::new("email", "Must be a valid email address"))
    }
}

pub fn check_password(password: &str) -> Result<(), FieldError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(FieldError::new(
            "password",
            format!("Must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"),
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(FieldError::new(
            "password",
            "Must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// Validated registration input.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub name: String,
}

/// Checks every registration field and reports all failures at once.
pub fn check_registration(email: &str, password: &str, name: &str) -> Result<Registration, AppError> {
    let mut errors = Vec::new();
    let email = normalize_email(email).map_err(|e| errors.push(e)).ok();
    if let Err(e) = check_password(password) {
        errors.push(e);
    }
    let name = name.trim().to_string();
    if name.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("Must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    match email {
        Some(email) if errors.is_empty() => Ok(Registration { email, name }),
        _ => Err(AppError::InvalidDocument(errors)),
    }
}
