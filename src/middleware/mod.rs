/// Middleware module
///
/// Bearer token authentication for protected routes.

mod bearer_middleware;

pub use bearer_middleware::BearerMiddleware;
