use crate::error::FhonkError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "fhonk";
pub const API_VERSION: &str = "v1";

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_PROFILE_URL: &str = "https://api.spotify.com/v1/me";
pub const SPOTIFY_DEFAULT_SCOPE: &str = "user-read-recently-played user-top-read";

/// Numeric and boolean settings, parsed by figment.
const TYPED_ENV_KEYS: &[&str] = &[
    "port",
    "verify_state",
    "fetch_profile",
    "http_timeout_secs",
    "state_ttl_secs",
    "max_pending_states",
];

/// Text settings, taken verbatim so that `CLIENT_ID=0123` stays a string.
const TEXT_ENV_KEYS: &[&str] = &[
    "app_env",
    "database_url",
    "loglevel",
    "client_id",
    "client_secret",
    "redirect_uri",
    "spotify_scope",
    "spotify_auth_url",
    "spotify_token_url",
    "spotify_profile_url",
    "frontend_url",
    "team_id",
    "key_id",
    "private_key",
];

/// Runtime configuration, built once in `main` and shared through the router state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub app_env: String,
    pub database_url: Option<String>,
    pub loglevel: String,

    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub spotify_scope: String,
    pub spotify_auth_url: Url,
    pub spotify_token_url: Url,
    pub spotify_profile_url: Url,

    /// Default post-login destination; its origin is the only one accepted for `redirect_to`.
    pub frontend_url: Option<Url>,
    pub verify_state: bool,
    pub fetch_profile: bool,
    pub http_timeout_secs: u64,
    pub state_ttl_secs: u64,
    /// Upper bound on authorize requests awaiting their callback.
    pub max_pending_states: usize,

    pub team_id: Option<String>,
    pub key_id: Option<String>,
    pub private_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            app_env: "development".to_string(),
            database_url: None,
            loglevel: "info".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: Url::parse("http://localhost:8080/callback").expect("static url"),
            spotify_scope: SPOTIFY_DEFAULT_SCOPE.to_string(),
            spotify_auth_url: Url::parse(SPOTIFY_AUTH_URL).expect("static url"),
            spotify_token_url: Url::parse(SPOTIFY_TOKEN_URL).expect("static url"),
            spotify_profile_url: Url::parse(SPOTIFY_PROFILE_URL).expect("static url"),
            frontend_url: None,
            verify_state: true,
            fetch_profile: true,
            http_timeout_secs: 10,
            state_ttl_secs: 600,
            max_pending_states: 10_000,
            team_id: None,
            key_id: None,
            private_key: None,
        }
    }
}

impl Config {
    /// Read the recognised environment variables and validate the result.
    pub fn from_env() -> Result<Self, FhonkError> {
        let text: BTreeMap<String, String> = Env::raw()
            .only(TEXT_ENV_KEYS)
            .iter()
            .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
            .collect();
        let cfg: Config = Figment::new()
            .merge(Env::raw().only(TYPED_ENV_KEYS))
            .merge(Serialized::defaults(text))
            .extract()
            .map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), FhonkError> {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {}
            _ => {
                return Err(FhonkError::InvalidConfig(
                    "DATABASE_URL not set in environment".to_string(),
                ));
            }
        }
        if self.max_pending_states == 0 {
            return Err(FhonkError::InvalidConfig(
                "MAX_PENDING_STATES must be greater than zero".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(FhonkError::InvalidConfig(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated database URL; callers run after [`Config::validate`].
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or_default()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.spotify_scope.split_whitespace()
    }
}
