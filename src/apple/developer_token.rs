use crate::config::Config;
use crate::error::FhonkError;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Developer tokens are valid for six hours.
const TOKEN_LIFETIME_HOURS: i64 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperTokenClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs Apple Music developer tokens (ES256) with the team's MusicKit key.
pub struct DeveloperTokenSigner {
    team_id: String,
    key_id: String,
    key: EncodingKey,
}

impl DeveloperTokenSigner {
    pub fn new(team_id: String, key_id: String, private_key_pem: &str) -> Result<Self, FhonkError> {
        // .env files usually carry the PEM on one line with literal "\n"
        let pem = private_key_pem.replace("\\n", "\n");
        let key = EncodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| {
            FhonkError::DeveloperTokenUnavailable(format!("failed to parse private key: {e}"))
        })?;
        Ok(Self {
            team_id,
            key_id,
            key,
        })
    }

    /// Build a signer from `TEAM_ID`, `KEY_ID` and `PRIVATE_KEY`.
    pub fn from_config(cfg: &Config) -> Result<Self, FhonkError> {
        match (&cfg.team_id, &cfg.key_id, &cfg.private_key) {
            (Some(team_id), Some(key_id), Some(private_key)) => {
                Self::new(team_id.clone(), key_id.clone(), private_key)
            }
            _ => Err(FhonkError::DeveloperTokenUnavailable(
                "TEAM_ID, KEY_ID and PRIVATE_KEY must all be set".to_string(),
            )),
        }
    }

    pub fn sign(&self) -> Result<String, FhonkError> {
        let now = Utc::now();
        let claims = DeveloperTokenClaims {
            iss: self.team_id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };
        let header = Header {
            kid: Some(self.key_id.clone()),
            ..Header::new(Algorithm::ES256)
        };
        Ok(jsonwebtoken::encode(&header, &claims, &self.key)?)
    }
}
