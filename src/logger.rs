use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::info;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier assigned to each request, available to handlers through
/// request extensions and echoed in the `x-request-id` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request logging middleware
/// Assigns a request id and logs method, path, status and latency.
/// Headers and bodies are never logged, so credentials stay out of logs.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
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
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let request_id = Uuid::new_v4().to_string();

        info!("[{}] Request started: {} {}", request_id, method, path);
        req.extensions_mut().insert(RequestId(request_id.clone()));

        let service = self.service.clone();

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    info!(
                        "[{}] Request rejected: {} {} - Status: {} ({}ms)",
                        request_id,
                        method,
                        path,
                        e.as_response_error().status_code().as_u16(),
                        start_time.elapsed().as_millis()
                    );
                    return Err(e);
                }
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            info!(
                "[{}] Request completed: {} {} - Status: {} ({}ms)",
                request_id,
                method,
                path,
                res.status().as_u16(),
                start_time.elapsed().as_millis()
            );

            Ok(res)
        })
    }
}
