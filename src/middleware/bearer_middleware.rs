/// Bearer Token Authentication Middleware
///
/// Resolves the token from the Authorization header through the
/// `TokenIssuer` and injects the resulting `CurrentToken` into request
/// extensions for route handlers (`web::ReqData<CurrentToken>`).

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{parse_bearer, TokenIssuer};
use crate::error::{AppError, AuthError, UnauthenticatedResponse};

fn unauthenticated(reason: &'static str) -> Error {
    let response = HttpResponse::Unauthorized().json(UnauthenticatedResponse::new());
    actix_web::error::InternalError::from_response(reason, response).into()
}

/// Must wrap every route that requires an authenticated token.
pub struct BearerMiddleware {
    issuer: Arc<TokenIssuer>,
}

impl BearerMiddleware {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerMiddlewareService {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
        }))
    }
}

pub struct BearerMiddlewareService<S> {
    service: Rc<S>,
    issuer: Arc<TokenIssuer>,
}

impl<S, B> Service<ServiceRequest> for BearerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let presented = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_bearer)
            .map(str::to_string);

        let service = self.service.clone();
        let issuer = self.issuer.clone();

        Box::pin(async move {
            let presented = match presented {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing or malformed Authorization header");
                    return Err(unauthenticated("Missing bearer token"));
                }
            };

            match issuer.authenticate(&presented).await {
                Ok(current) => {
                    tracing::debug!(
                        account_id = %current.account.id,
                        token_id = %current.token.id,
                        "Bearer token accepted"
                    );
                    req.extensions_mut().insert(current);
                    service.call(req).await
                }
                Err(AppError::Auth(AuthError::Unauthenticated)) => {
                    tracing::warn!(path = %req.path(), "Bearer token rejected");
                    Err(unauthenticated("Invalid bearer token"))
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
