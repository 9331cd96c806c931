//! Shared harness: spawns the server on a random port over in-memory
//! repositories seeded with one account.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use bearer_auth::auth::{Account, BcryptHasher, PasswordHasher};
use bearer_auth::configuration::AuthSettings;
use bearer_auth::repository::{InMemoryAccountRepository, InMemoryTokenRepository};
use bearer_auth::startup::{run, AppState};
use serde_json::{json, Value};
use uuid::Uuid;

pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_SECRET: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub alice: Account,
    pub tokens: InMemoryTokenRepository,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn post_login(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/login", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_logout(&self, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/logout", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_user(&self, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/user", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Logs alice in from `device` and returns the token.
    pub async fn login_alice(&self, device: &str) -> String {
        let response = self
            .post_login(&json!({
                "identifier": ALICE_EMAIL,
                "secret": ALICE_SECRET,
                "deviceLabel": device
            }))
            .await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        body["token"].as_str().expect("token missing").to_string()
    }
}

pub fn test_auth_settings() -> AuthSettings {
    AuthSettings {
        bcrypt_cost: 4,
        ..AuthSettings::default()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_auth_settings()).await
}

pub async fn spawn_app_with(auth: AuthSettings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let hasher = BcryptHasher::new(auth.bcrypt_cost);
    let accounts = InMemoryAccountRepository::new();
    let alice = Account {
        id: Uuid::new_v4(),
        name: "Alice".to_string(),
        email: ALICE_EMAIL.to_string(),
        password_hash: hasher.hash(ALICE_SECRET).expect("Failed to hash secret"),
    };
    accounts.insert(alice.clone()).expect("Failed to seed account");
    let tokens = InMemoryTokenRepository::new();

    let state = AppState::new(Arc::new(accounts), Arc::new(tokens.clone()), &auth)
        .expect("Failed to build app state");
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        alice,
        tokens,
        client: reqwest::Client::new(),
    }
}
