/// Authentication Routes
///
/// Login with credentials, logout of the current token, and current
/// account information.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::{AccountSummary, CredentialVerifier, CurrentToken, TokenIssuer};
use crate::error::{ErrorContext, RequestError};
use crate::logger::RequestId;
use crate::validators::{validate_login, Field};

const LOGOUT_MESSAGE: &str = "Successfully logged out.";

/// Login request fields as sent. Values are kept as raw JSON so that a
/// wrongly typed field fails on its own key instead of the whole body.
#[derive(Default)]
pub struct LoginRequest {
    pub identifier: Option<Value>,
    pub secret: Option<Value>,
    pub device_label: Option<Value>,
}

impl LoginRequest {
    /// Reads the body regardless of content type. An empty body,
    /// unparsable JSON or a non-object is treated as `{}`. The legacy
    /// names `email`, `password` and `device_name` are accepted.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut map)) => Self {
                identifier: take_field(&mut map, &["identifier", "email"]),
                secret: take_field(&mut map, &["secret", "password"]),
                device_label: take_field(&mut map, &["deviceLabel", "device_name", "device_label"]),
            },
            _ => Self::default(),
        }
    }
}

/// First non-null value under any of `names`.
fn take_field(map: &mut Map<String, Value>, names: &[&str]) -> Option<Value> {
    names
        .iter()
        .filter_map(|name| map.remove(*name))
        .find(|value| !value.is_null())
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub account: AccountSummary,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

fn context(operation: &str, request_id: Option<web::ReqData<RequestId>>) -> ErrorContext {
    let context = ErrorContext::new(operation);
    match request_id {
        Some(id) => context.with_request_id(id.into_inner().0),
        None => context,
    }
}

/// POST /login
///
/// Verify credentials and issue a bearer token for the given device.
///
/// # Errors
/// - 422: Validation errors keyed by field; no credential check runs
/// - 422: Invalid credentials, reported on `identifier` whether the
///   account is unknown or the secret is wrong
/// - 500/503: Storage failures
pub async fn login(
    body: web::Bytes,
    verifier: web::Data<CredentialVerifier>,
    issuer: web::Data<TokenIssuer>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, RequestError> {
    let context = context("login", request_id);
    let request = LoginRequest::from_body(&body);

    let login = validate_login(
        Field::from_json(request.identifier.as_ref()),
        Field::from_json(request.secret.as_ref()),
        Field::from_json(request.device_label.as_ref()),
    )
    .map_err(|e| context.fail(e))?;

    let account = verifier
        .verify(&login.identifier, &login.secret)
        .await
        .map_err(|e| context.fail(e))?;

    let context = context.with_account_id(account.id.to_string());
    let issued = issuer
        .issue(&account, &login.device_label)
        .await
        .map_err(|e| context.fail(e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = ?context.account_id,
        token_id = %issued.token.id,
        "Account logged in"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        token: issued.plaintext,
        account: account.summary(),
    }))
}

/// POST /logout
///
/// Revoke the token presented on this request. Other tokens of the same
/// account stay valid.
///
/// # Authentication
/// Requires `Authorization: Bearer <token>`, resolved by `BearerMiddleware`.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: Token was revoked concurrently after the middleware resolved it
pub async fn logout(
    current: web::ReqData<CurrentToken>,
    issuer: web::Data<TokenIssuer>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, RequestError> {
    let current = current.into_inner();
    let context = context("logout", request_id).with_account_id(current.account.id.to_string());

    issuer
        .revoke(&current.token)
        .await
        .map_err(|e| context.fail(e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = ?context.account_id,
        token_id = %current.token.id,
        "Account logged out"
    );

    Ok(HttpResponse::Ok().json(LogoutResponse {
        success: true,
        message: LOGOUT_MESSAGE,
    }))
}

/// GET /user
///
/// The account owning the presented token.
pub async fn current_account(current: web::ReqData<CurrentToken>) -> HttpResponse {
    HttpResponse::Ok().json(current.account.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::dev::Service;
    use actix_web::{test, App, HttpMessage};
    use uuid::Uuid;

    use crate::auth::Account;
    use crate::logger::{LoggerMiddleware, REQUEST_ID_HEADER};
    use crate::repository::{InMemoryAccountRepository, InMemoryTokenRepository};

    #[::core::prelude::v1::test]
    fn test_login_request_accepts_both_field_spellings() {
        let current = LoginRequest::from_body(
            br#"{"identifier":"alice@example.com","secret":"password123","deviceLabel":"laptop"}"#,
        );
        assert_eq!(current.identifier, Some(Value::from("alice@example.com")));
        assert_eq!(current.device_label, Some(Value::from("laptop")));

        let legacy = LoginRequest::from_body(
            br#"{"email":"alice@example.com","password":"password123","device_name":"laptop"}"#,
        );
        assert_eq!(legacy.secret, Some(Value::from("password123")));
        assert_eq!(legacy.device_label, Some(Value::from("laptop")));
    }

    #[::core::prelude::v1::test]
    fn test_login_request_keeps_wrongly_typed_fields() {
        let request = LoginRequest::from_body(
            br#"{"identifier":"alice@example.com","secret":"password123","deviceLabel":5}"#,
        );
        assert_eq!(request.identifier, Some(Value::from("alice@example.com")));
        assert_eq!(request.device_label, Some(Value::from(5)));
    }

    #[::core::prelude::v1::test]
    fn test_unusable_bodies_are_empty_requests() {
        let bodies: [&[u8]; 5] = [b"", b"not json", b"[1, 2]", b"\"text\"", b"{}"];
        for body in bodies {
            let request = LoginRequest::from_body(body);
            assert!(request.identifier.is_none());
            assert!(request.secret.is_none());
            assert!(request.device_label.is_none());
        }
    }

    #[::core::prelude::v1::test]
    fn test_null_falls_back_to_legacy_name() {
        let request =
            LoginRequest::from_body(br#"{"identifier":null,"email":"alice@example.com"}"#);
        assert_eq!(request.identifier, Some(Value::from("alice@example.com")));
    }

    #[actix_web::test]
    async fn test_logout_of_revoked_token_is_404_with_request_id() {
        let account = Account {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "unused".to_string(),
        };
        let accounts = InMemoryAccountRepository::new();
        accounts.insert(account.clone()).unwrap();
        let issuer = Arc::new(TokenIssuer::new(
            Arc::new(accounts),
            Arc::new(InMemoryTokenRepository::new()),
            None,
        ));

        // resolved by the middleware, then revoked by a concurrent logout
        let issued = issuer.issue(&account, "laptop").await.unwrap();
        let current = issuer.authenticate(&issued.plaintext).await.unwrap();
        issuer.revoke(&current.token).await.unwrap();

        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware)
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(current.clone());
                    srv.call(req)
                })
                .app_data(web::Data::from(issuer))
                .route("/logout", web::post().to(logout)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/logout").to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 404);

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("request id header")
            .to_str()
            .unwrap()
            .to_string();

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error_id"], request_id.as_str());
        assert_eq!(body["code"], "TOKEN_NOT_FOUND");
        assert_eq!(body["status"], 404);
        assert_eq!(body["message"], "Token not found");
    }
}
