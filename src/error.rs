/// Error Handling Module
///
/// Unified error handling for the authentication service:
/// 1. Domain-specific error types (validation, database, authentication)
/// 2. A central `AppError` used for control flow
/// 3. HTTP response mapping with structured, logged errors
///
/// No error message or log line carries a secret or a stored hash.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// Field the credential failure is reported against.
pub const CREDENTIALS_FIELD: &str = "identifier";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "These credentials do not match our records.";
pub const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated.";

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Per-field validation failures, keyed by request field name.
///
/// Serializes as `{"field": ["message", ...]}`; field order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl StdError for FieldErrors {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Authentication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier or wrong secret. The two are never distinguished.
    InvalidCredentials,
    /// Missing, unknown, revoked or expired bearer token.
    Unauthenticated,
    /// Revocation target no longer resolves to an active token.
    TokenNotFound,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::Unauthenticated => write!(f, "Unauthenticated"),
            AuthError::TokenNotFound => write!(f, "Token not found"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(FieldErrors),
    Database(DatabaseError),
    Auth(AuthError),
    Internal(String),
}

impl AppError {
    pub fn auth_kind(&self) -> Option<AuthError> {
        match self {
            AppError::Auth(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<FieldErrors> for AppError {
    fn from(err: FieldErrors) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            other => AppError::Database(DatabaseError::UnexpectedError(other.to_string())),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body for non-validation failures
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body of a 422 response: `{"errors": {"field": ["message"]}}`
#[derive(Debug, serde::Serialize)]
pub struct ValidationErrorResponse<'a> {
    pub errors: &'a FieldErrors,
}

/// Body of a 401 response
#[derive(Debug, serde::Serialize)]
pub struct UnauthenticatedResponse {
    pub message: &'static str,
}

impl UnauthenticatedResponse {
    pub fn new() -> Self {
        Self {
            message: UNAUTHENTICATED_MESSAGE,
        }
    }
}

impl Default for UnauthenticatedResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts errors to HTTP responses with logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> HttpResponse;
    fn log_error(&self, context: &ErrorContext);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> HttpResponse {
        let (status, code, message) = match self {
            AppError::Validation(errors) => {
                return HttpResponse::UnprocessableEntity()
                    .json(ValidationErrorResponse { errors });
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                let errors = FieldErrors::single(CREDENTIALS_FIELD, INVALID_CREDENTIALS_MESSAGE);
                return HttpResponse::UnprocessableEntity()
                    .json(ValidationErrorResponse { errors: &errors });
            }
            AppError::Auth(AuthError::Unauthenticated) => {
                return HttpResponse::Unauthorized().json(UnauthenticatedResponse::new());
            }
            AppError::Auth(AuthError::TokenNotFound) => (
                StatusCode::NOT_FOUND,
                "TOKEN_NOT_FOUND",
                "Token not found".to_string(),
            ),
            AppError::Database(e) => match e {
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        HttpResponse::build(status).json(body)
    }

    fn log_error(&self, context: &ErrorContext) {
        let request_id = context.request_id.as_str();
        let operation = context.operation.as_str();
        let account_id = context.account_id.as_deref().unwrap_or("-");
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id, operation, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id, operation, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id, operation, account_id, error = %e, "Authentication error");
            }
            AppError::Database(e) => {
                tracing::error!(request_id, operation, account_id, error = %e, "Database error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id, operation, account_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    /// Used when no request context is at hand; the error id is fresh.
    fn error_response(&self) -> HttpResponse {
        let context = ErrorContext::new("unknown");
        self.log_error(&context);
        <Self as ErrorHandler>::error_response(self, &context.request_id)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(AuthError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::TokenNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(DatabaseError::ConnectionPool(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context carried into log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub account_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            account_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_account_id(mut self, account_id: String) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Bind `error` to this request so its response and log line carry
    /// the request id.
    pub fn fail(&self, error: impl Into<AppError>) -> RequestError {
        RequestError {
            error: error.into(),
            context: self.clone(),
        }
    }
}

/// An `AppError` raised while serving a known request. Handlers return
/// this so the `error_id` in the body matches the `x-request-id` header.
#[derive(Debug)]
pub struct RequestError {
    pub error: AppError,
    pub context: ErrorContext,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.context.operation, self.error)
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        self.error.log_error(&self.context);
        ErrorHandler::error_response(&self.error, &self.context.request_id)
    }

    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_field_errors_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("identifier", "first");
        errors.add("identifier", "second");
        errors.add("secret", "third");

        assert_eq!(errors.get("identifier").unwrap().len(), 2);
        assert!(errors.contains("secret"));
        assert!(!errors.contains("deviceLabel"));
        assert_eq!(errors.to_string(), "invalid fields: identifier, secret");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation(FieldErrors::single("secret", "x")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Auth(AuthError::Unauthenticated).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::TokenNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_invalid_credentials_is_reported_on_identifier() {
        let response =
            ResponseError::error_response(&AppError::Auth(AuthError::InvalidCredentials));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({ "errors": { "identifier": [INVALID_CREDENTIALS_MESSAGE] } })
        );
    }

    #[actix_web::test]
    async fn test_database_error_hides_details() {
        let err = AppError::Database(DatabaseError::UnexpectedError(
            "relation \"accounts\" does not exist".to_string(),
        ));
        let response = ResponseError::error_response(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("accounts"));
    }

    #[test]
    fn test_sqlx_pool_errors_map_to_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Database(DatabaseError::ConnectionPool(_))));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_request_error_reuses_request_id() {
        let context = ErrorContext::new("logout").with_request_id("req-42".to_string());
        let err = context.fail(AuthError::TokenNotFound);
        assert_eq!(err.to_string(), "logout failed: Token not found");

        let response = ResponseError::error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error_id"], "req-42");
        assert_eq!(body["code"], "TOKEN_NOT_FOUND");
        assert_eq!(body["status"], 404);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("login");
        assert_eq!(ctx.operation, "login");
        assert!(ctx.account_id.is_none());

        let ctx = ctx.with_account_id("account-123".to_string());
        assert_eq!(ctx.account_id.as_deref(), Some("account-123"));
    }
}
