use serde::{Deserialize, Serialize};

/// Body returned by the Spotify token endpoint for `grant_type=authorization_code`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Subset of `GET /v1/me` needed to key a credential record.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Tokens handed back to the caller once the exchange succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<SpotifyTokenResponse> for TokenPair {
    fn from(value: SpotifyTokenResponse) -> Self {
        Self {
            access_token: value.access_token,
            refresh_token: value.refresh_token,
        }
    }
}
