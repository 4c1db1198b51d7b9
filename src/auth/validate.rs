use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::{LoginRequest, RegisterRequest};

/// Field name to human-readable message, keyed by the wire field name.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration payload after validation, with email lowercased and names
/// trimmed. Construction goes through [`validate_register`] only.
#[derive(Debug)]
pub struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login payload after validation, with email lowercased.
#[derive(Debug)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

/// Checks the shape of a registration request. Pure: no store access, no
/// side effects. Expected failures come back as a field map, never a panic.
pub fn validate_register(req: &RegisterRequest) -> Result<ValidRegistration, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.insert("email", "Please enter a valid email address");
    }

    if req.password.len() < MIN_PASSWORD_LEN {
        errors.insert("password", "Password must be at least 6 characters");
    }

    if req.confirm_password.is_empty() {
        errors.insert("confirmPassword", "Please confirm your password");
    } else if req.confirm_password != req.password {
        // Attached to confirmPassword, not password: the second field is
        // the one the user retypes.
        errors.insert("confirmPassword", "Passwords don't match");
    }

    let first_name = req.first_name.trim();
    if first_name.is_empty() {
        errors.insert("firstName", "First name is required");
    }

    let last_name = req.last_name.trim();
    if last_name.is_empty() {
        errors.insert("lastName", "Last name is required");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidRegistration {
        email,
        password: req.password.clone(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    })
}

/// Checks the shape of a login request. No password length rule here: the
/// real check is hash verification against the stored credential.
pub fn validate_login(req: &LoginRequest) -> Result<ValidLogin, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.insert("email", "Please enter a valid email address");
    }

    if req.password.is_empty() {
        errors.insert("password", "Password is required");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidLogin {
        email,
        password: req.password.clone(),
    })
}
