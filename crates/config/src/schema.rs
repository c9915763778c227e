use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_PROJECT_NAME: &str = "DevBoard API";
pub const DEFAULT_API_PREFIX: &str = "/api";

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub user: String,
    pub password: String,
    pub server: String,
    pub port: u16,
    pub db: String,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "changethis".to_string(),
            server: "localhost".to_string(),
            port: 5432,
            db: "devboard".to_string(),
        }
    }
}

impl PostgresSettings {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.server, self.port, self.db
        )
    }
}

// Never print the password.
impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("db", &self.db)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "projectName")]
    pub project_name: String,
    #[serde(alias = "apiPrefix")]
    pub api_prefix: String,
    #[serde(alias = "databaseUrl")]
    pub database_url: Option<String>,
    pub postgres: Option<PostgresSettings>,
    #[serde(alias = "corsOrigins")]
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            database_url: None,
            postgres: None,
            cors_origins: default_cors_origins(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Defaults, then `.env`, then the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Layers `.env` and the process environment over `self`.
    pub fn with_env(mut self) -> Self {
        crate::load_dotenv();
        self.apply_env();
        self
    }

    pub fn normalized(mut self) -> Self {
        self.project_name = self.project_name.trim().to_string();
        self.api_prefix = self.api_prefix.trim().trim_end_matches('/').to_string();

        if matches!(
            self.database_url.as_deref(),
            Some(url) if url.trim().is_empty()
        ) {
            self.database_url = None;
        }

        self.cors_origins = self
            .cors_origins
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        self
    }

    /// Store URL from `database_url`, else assembled from `postgres`.
    ///
    /// `None` means no store was configured and the local SQLite file applies.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| self.postgres.as_ref().map(PostgresSettings::url))
    }

    /// Backend name for logs; the URL itself may hold credentials.
    pub fn database_backend(&self) -> &'static str {
        match self.database_url() {
            Some(url) if url.starts_with("postgres") => "postgres",
            Some(url) if url.starts_with("sqlite") => "sqlite",
            Some(_) => "other",
            None => "sqlite",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "project_name must not be empty".to_string(),
            ));
        }
        if self.api_prefix.is_empty() || !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "api_prefix must start with '/': {:?}",
                self.api_prefix
            )));
        }
        if let Some(origin) = self
            .cors_origins
            .iter()
            .find(|origin| !is_http_origin(origin))
        {
            return Err(ConfigError::Validation(format!(
                "CORS origin must be an absolute http(s) URL: {origin}"
            )));
        }
        Ok(())
    }
}

fn is_http_origin(origin: &str) -> bool {
    let rest = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.contains('/'))
}
