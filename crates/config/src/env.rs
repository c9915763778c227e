//! Environment overrides for [`Config`].
//!
//! Unparseable values are logged and the current value is kept.

use std::str::FromStr;

use crate::schema::Config;

const POSTGRES_KEYS: [&str; 5] = [
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_SERVER",
    "POSTGRES_PORT",
    "POSTGRES_DB",
];

impl Config {
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides read through `get`, then re-normalizes.
    pub fn apply_env_with<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|value| !value.trim().is_empty());

        if let Some(name) = get("PROJECT_NAME") {
            self.project_name = name;
        }
        if let Some(prefix) = get("API_PREFIX") {
            self.api_prefix = prefix;
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = Some(url);
        }

        if POSTGRES_KEYS.iter().any(|key| get(*key).is_some()) {
            let mut postgres = self.postgres.take().unwrap_or_default();
            if let Some(user) = get("POSTGRES_USER") {
                postgres.user = user;
            }
            if let Some(password) = get("POSTGRES_PASSWORD") {
                postgres.password = password;
            }
            if let Some(server) = get("POSTGRES_SERVER") {
                postgres.server = server;
            }
            if let Some(port) = get("POSTGRES_PORT") {
                postgres.port = parse_or_keep("POSTGRES_PORT", &port, postgres.port);
            }
            if let Some(db) = get("POSTGRES_DB") {
                postgres.db = db;
            }
            self.postgres = Some(postgres);
        }

        if let Some(raw) = get("BACKEND_CORS_ORIGINS") {
            match parse_origins(&raw) {
                Some(origins) => self.cors_origins = origins,
                None => tracing::warn!(
                    key = "BACKEND_CORS_ORIGINS",
                    value = %raw,
                    "Invalid value, keeping current origins"
                ),
            }
        }

        if let Some(host) = get("HOST") {
            self.host = host;
        }
        if let Some(port) = get("PORT").or_else(|| get("BACKEND_PORT")) {
            self.port = parse_or_keep("PORT", &port, self.port);
        }

        *self = std::mem::take(self).normalized();
    }
}

fn parse_or_keep<T>(key: &str, raw: &str, current: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, keeping = %current, "Invalid value in environment");
            current
        }
    }
}

/// Accepts `a,b,c` or a JSON array of strings.
fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(raw).ok();
    }
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::from_raw(r#"{ "project_name": "From file", "port": 9000 }"#);
        config.apply_env_with(env(&[
            ("PROJECT_NAME", "From env"),
            ("BACKEND_PORT", "8100"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]));

        assert_eq!(config.project_name, "From env");
        assert_eq!(config.port, 8100);
        assert_eq!(config.database_url().as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn cors_origins_accept_list_or_json() {
        let mut config = Config::default();
        config.apply_env_with(env(&[(
            "BACKEND_CORS_ORIGINS",
            "http://a.test, http://b.test",
        )]));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);

        config.apply_env_with(env(&[("BACKEND_CORS_ORIGINS", r#"["https://c.test/"]"#)]));
        assert_eq!(config.cors_origins, vec!["https://c.test"]);

        config.apply_env_with(env(&[("BACKEND_CORS_ORIGINS", "[not json")]));
        assert_eq!(config.cors_origins, vec!["https://c.test"]);
    }

    #[test]
    fn partial_postgres_env_fills_defaults() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("POSTGRES_SERVER", "db"), ("POSTGRES_PORT", "oops")]));

        let postgres = config.postgres.clone().unwrap();
        assert_eq!(postgres.server, "db");
        assert_eq!(postgres.port, 5432);
        assert_eq!(
            config.database_url().as_deref(),
            Some("postgres://postgres:changethis@db:5432/devboard")
        );
    }

    #[test]
    fn invalid_port_keeps_current_value() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("PORT", "eighty")]));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("PROJECT_NAME", "   "), ("DATABASE_URL", "")]));
        assert_eq!(config, Config::default());
    }
}
