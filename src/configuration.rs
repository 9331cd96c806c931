use config::{ConfigError, Environment, File};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
}

// Keeps the database password out of Debug output.
impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token and password hashing settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    /// bcrypt work factor (4..=31)
    pub bcrypt_cost: u32,
    /// Lifetime of issued tokens; `None` means tokens live until revoked.
    pub token_expiry_minutes: Option<i64>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            token_expiry_minutes: None,
        }
    }
}

/// Loads settings from defaults, an optional `configuration` file
/// (any format the `config` crate understands) and `APP_`-prefixed
/// environment variables, e.g. `APP_DATABASE__HOST=db`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "password")?
        .set_default("database.port", 5432)?
        .set_default("database.host", "localhost")?
        .set_default("database.database_name", "bearer_auth")?
        .set_default("database.max_connections", 5)?
        .set_default("auth.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(File::with_name("configuration").required(false))
        .add_source(
            Environment::with_prefix("app")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
