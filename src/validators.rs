/// Input validators for the login request
/// Features:
/// 1. Presence checks with per-field messages
/// 2. DoS protection: input length limits
/// 3. Email validation (RFC 5322 simplified)
///
/// Every check reports against the request field it concerns, and all
/// failing fields are collected before the request is rejected.

use regex::Regex;
use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::FieldErrors;

pub const IDENTIFIER_FIELD: &str = "identifier";
pub const SECRET_FIELD: &str = "secret";
pub const DEVICE_LABEL_FIELD: &str = "deviceLabel";

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_SECRET_BYTES: usize = 1024;
pub const MAX_DEVICE_LABEL_LENGTH: usize = 255;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// A login request that passed validation. Fields are trimmed where that
/// is meaningful; the secret is passed through untouched.
pub struct ValidLogin {
    pub identifier: String,
    pub secret: String,
    pub device_label: String,
}

impl std::fmt::Debug for ValidLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidLogin")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("device_label", &self.device_label)
            .finish()
    }
}

/// A request field as it arrived: absent (or `null`), a string, or some
/// other JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Missing,
    Text(&'a str),
    NotText,
}

impl<'a> Field<'a> {
    pub fn from_json(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Field::Missing,
            Some(Value::String(s)) => Field::Text(s),
            Some(_) => Field::NotText,
        }
    }
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(value: &'a str) -> Self {
        Field::Text(value)
    }
}

fn required_message(field: &str) -> String {
    format!("The {} field is required.", field)
}

fn not_text_message(field: &str) -> String {
    format!("The {} field must be a string.", field)
}

/// Resolves a field to its text, recording a failure when it is absent,
/// blank under `is_blank`, or not a string.
fn text_field<'a>(
    field: Field<'a>,
    name: &str,
    is_blank: fn(&str) -> bool,
    errors: &mut FieldErrors,
) -> Option<&'a str> {
    match field {
        Field::Text(value) if !is_blank(value) => Some(value),
        Field::Missing | Field::Text(_) => {
            errors.add(name, required_message(name));
            None
        }
        Field::NotText => {
            errors.add(name, not_text_message(name));
            None
        }
    }
}

/// Validates the three login fields, collecting every failure. Each field
/// only ever reports against its own key.
pub fn validate_login(
    identifier: Field<'_>,
    secret: Field<'_>,
    device_label: Field<'_>,
) -> Result<ValidLogin, FieldErrors> {
    let mut errors = FieldErrors::new();

    let identifier = text_field(identifier, IDENTIFIER_FIELD, |s| s.trim().is_empty(), &mut errors)
        .and_then(|value| match is_valid_email(value) {
            Ok(email) => Some(email),
            Err(message) => {
                errors.add(IDENTIFIER_FIELD, message);
                None
            }
        });

    // secrets are never trimmed; only the empty string counts as missing
    let secret = text_field(secret, SECRET_FIELD, str::is_empty, &mut errors).and_then(|value| {
        if value.len() > MAX_SECRET_BYTES {
            errors.add(
                SECRET_FIELD,
                format!("The {} field must not be greater than {} bytes.", SECRET_FIELD, MAX_SECRET_BYTES),
            );
            None
        } else {
            Some(value.to_string())
        }
    });

    let device_label = match device_label {
        Field::NotText => Err(not_text_message(DEVICE_LABEL_FIELD)),
        Field::Missing => validate_device_label(""),
        Field::Text(value) => validate_device_label(value),
    };
    let device_label = match device_label {
        Ok(label) => Some(label),
        Err(message) => {
            errors.add(DEVICE_LABEL_FIELD, message);
            None
        }
    };

    match (identifier, secret, device_label) {
        (Some(identifier), Some(secret), Some(device_label)) => Ok(ValidLogin {
            identifier,
            secret,
            device_label,
        }),
        _ => Err(errors),
    }
}

/// Validates a device label: required after trimming, bounded length,
/// no control characters.
pub fn validate_device_label(label: &str) -> Result<String, String> {
    let trimmed = label.trim();

    if trimmed.is_empty() {
        return Err(required_message(DEVICE_LABEL_FIELD));
    }

    if trimmed.chars().count() > MAX_DEVICE_LABEL_LENGTH {
        return Err(format!(
            "The {} field must not be greater than {} characters.",
            DEVICE_LABEL_FIELD, MAX_DEVICE_LABEL_LENGTH
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(format!("The {} field contains invalid characters.", DEVICE_LABEL_FIELD));
    }

    Ok(trimmed.to_string())
}

/// Validates an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Rejects suspicious shapes (oversized local part, NUL bytes)
pub fn is_valid_email(email: &str) -> Result<String, String> {
    let trimmed = email.trim();
    let invalid = || format!("The {} field must be a valid email address.", IDENTIFIER_FIELD);

    // Length validation - prevent DoS attacks with extremely long inputs
    if trimmed.len() < MIN_EMAIL_LENGTH || trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(invalid());
    }

    if !EMAIL_REGEX.is_match(trimmed) || has_suspicious_email_patterns(trimmed) {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if email.matches('@').count() != 1 {
        return true;
    }

    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }

    email.contains('\0')
}
