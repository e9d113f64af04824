//! Form validation that runs before any network call.
//!
//! Each `validate_*` function returns the first failing rule as a
//! [`CoreError::Validation`] so a form can show one inline message.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;

/// Message shown when any required field is empty.
pub const MSG_ALL_FIELDS_REQUIRED: &str = "Please fill in all fields";

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// The registration form as typed by the user.
#[derive(Debug, Clone, Default, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Validate a registration form. Field order decides which message wins.
pub fn validate_registration(form: &RegistrationForm) -> Result<(), CoreError> {
    let required = [
        &form.username,
        &form.email,
        &form.password,
        &form.confirm_password,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
        return Err(CoreError::Validation(MSG_ALL_FIELDS_REQUIRED.to_string()));
    }
    form.validate()
        .map_err(|e| first_error(&e, &["username", "email", "password", "confirm_password"]))
}

// ---------------------------------------------------------------------------
// MQTT credentials
// ---------------------------------------------------------------------------

/// Credentials for registering a device with the broker.
#[derive(Debug, Clone, Default, Validate)]
pub struct MqttCredentialsForm {
    #[validate(length(min = 1, message = "MQTT username is required"))]
    pub mqtt_username: String,
    #[validate(length(min = 1, message = "MQTT password is required"))]
    pub mqtt_password: String,
    #[validate(custom(function = "validate_broker_url"))]
    pub broker_url: String,
}

pub fn validate_mqtt_credentials(form: &MqttCredentialsForm) -> Result<(), CoreError> {
    form.validate()
        .map_err(|e| first_error(&e, &["mqtt_username", "mqtt_password", "broker_url"]))
}

/// Broker URLs must carry a scheme and a host, e.g. `tcp://broker:1883`.
fn validate_broker_url(url: &str) -> Result<(), ValidationError> {
    match url.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err(ValidationError::new("broker_url")
            .with_message("Broker URL must look like scheme://host:port".into())),
    }
}

// ---------------------------------------------------------------------------
// Admin user management
// ---------------------------------------------------------------------------

/// Form for creating a user from the admin screen.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewUserForm {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Optional; the backend generates one when omitted.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

pub fn validate_new_user(form: &NewUserForm) -> Result<(), CoreError> {
    form.validate()
        .map_err(|e| first_error(&e, &["username", "email", "password"]))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pick the message of the first failing field, in `order`.
fn first_error(errors: &ValidationErrors, order: &[&str]) -> CoreError {
    let fields = errors.field_errors();
    let message = order
        .iter()
        .filter_map(|name| fields.get(*name))
        .filter_map(|errs| errs.first())
        .map(|err| {
            err.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string())
        })
        .next()
        .unwrap_or_else(|| errors.to_string());
    CoreError::Validation(message)
}
