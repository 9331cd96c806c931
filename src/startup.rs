use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{BcryptHasher, CredentialVerifier, PasswordHasher, TokenIssuer};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use crate::logger::LoggerMiddleware;
use crate::middleware::BearerMiddleware;
use crate::repository::{AccountRepository, TokenRepository};
use crate::routes::{current_account, health_check, login, logout};

/// Shared services handed to every worker
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<CredentialVerifier>,
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    /// Wires the verifier and issuer over the given repositories with a
    /// bcrypt hasher at the configured cost.
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        tokens: Arc<dyn TokenRepository>,
        auth: &AuthSettings,
    ) -> Result<Self, AppError> {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(auth.bcrypt_cost));
        let verifier = CredentialVerifier::new(accounts.clone(), hasher)?;
        let lifetime = auth.token_expiry_minutes.map(Duration::minutes);
        let issuer = TokenIssuer::new(accounts, tokens, lifetime);

        Ok(Self {
            verifier: Arc::new(verifier),
            issuer: Arc::new(issuer),
        })
    }
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let verifier = web::Data::from(state.verifier);
    let issuer = web::Data::from(state.issuer);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(verifier.clone())
            .app_data(issuer.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            // Protected routes (require a bearer token)
            .service(
                web::resource("/logout")
                    .wrap(BearerMiddleware::new(issuer.clone().into_inner()))
                    .route(web::post().to(logout)),
            )
            .service(
                web::resource("/user")
                    .wrap(BearerMiddleware::new(issuer.clone().into_inner()))
                    .route(web::get().to(current_account)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
