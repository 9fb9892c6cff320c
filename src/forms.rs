//! Form Validation
//!
//! Field constraints checked before login, registration and profile
//! updates are sent. Errors name the offending field and are shown locally.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::{Credentials, ProfileUpdate, Registration};

/// A field that failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("valid email pattern")
    })
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid username pattern"))
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), FormError> {
    let email = credentials.email.trim();
    if email.is_empty() {
        return Err(FormError::new("email", "email is required"));
    }
    if !email_pattern().is_match(email) {
        return Err(FormError::new("email", "invalid email address"));
    }

    if credentials.password.is_empty() {
        return Err(FormError::new("password", "password is required"));
    }
    if credentials.password.chars().count() < 6 {
        return Err(FormError::new(
            "password",
            "password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub fn validate_registration(registration: &Registration) -> Result<(), FormError> {
    validate_name("first_name", &registration.first_name)?;
    validate_name("last_name", &registration.last_name)?;
    validate_username(&registration.username)?;

    if !email_pattern().is_match(registration.email.trim()) {
        return Err(FormError::new("email", "invalid email address"));
    }

    let password = &registration.password;
    if password.chars().count() < 8 {
        return Err(FormError::new(
            "password",
            "password must be at least 8 characters",
        ));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(FormError::new(
            "password",
            "password needs an uppercase letter, a lowercase letter and a digit",
        ));
    }

    if registration.password_confirm != *password {
        return Err(FormError::new("password_confirm", "passwords do not match"));
    }

    Ok(())
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), FormError> {
    if update.is_empty() {
        return Err(FormError::new("profile", "nothing to update"));
    }
    if let Some(first_name) = &update.first_name {
        validate_name("first_name", first_name)?;
    }
    if let Some(last_name) = &update.last_name {
        validate_name("last_name", last_name)?;
    }
    if let Some(username) = &update.username {
        validate_username(username)?;
    }
    Ok(())
}

fn validate_name(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().chars().count() < 2 {
        return Err(FormError::new(field, "must be at least 2 characters"));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), FormError> {
    if username.chars().count() < 3 {
        return Err(FormError::new(
            "username",
            "username must be at least 3 characters",
        ));
    }
    if !username_pattern().is_match(username) {
        return Err(FormError::new(
            "username",
            "only letters, digits and underscores are allowed",
        ));
    }
    Ok(())
}
