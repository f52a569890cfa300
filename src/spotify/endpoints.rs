use crate::config::Config;
use crate::error::ProviderClientError;
use crate::types::{SpotifyProfile, SpotifyTokenResponse};

use axum::http::StatusCode;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, basic::BasicClient};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Stateless Spotify accounts/web API endpoints.
#[derive(Clone)]
pub struct SpotifyEndpoints {
    cfg: Arc<Config>,
    http: reqwest::Client,
}

impl SpotifyEndpoints {
    pub fn new(cfg: Arc<Config>, http: reqwest::Client) -> Self {
        Self { cfg, http }
    }

    /// Authorize URL carrying `client_id`, `response_type=code`, `redirect_uri`, `scope` and `state`.
    pub fn build_authorize_url(&self, state: &str) -> Url {
        let client = BasicClient::new(ClientId::new(self.cfg.client_id.clone()))
            .set_auth_uri(AuthUrl::from_url(self.cfg.spotify_auth_url.clone()))
            .set_redirect_uri(RedirectUrl::from_url(self.cfg.redirect_uri.clone()));

        let (auth_url, _csrf) = client
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scopes(self.cfg.scopes().map(|s| Scope::new(s.to_string())))
            .url();
        auth_url
    }

    /// Exchange an authorization code at the token endpoint using HTTP Basic client auth.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
    ) -> Result<SpotifyTokenResponse, ProviderClientError> {
        let resp = self
            .http
            .post(self.cfg.spotify_token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.cfg.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        debug!(status = %resp.status(), "Spotify token endpoint responded");

        let tokens: SpotifyTokenResponse = decode_provider_response(resp).await?;
        info!(
            expires_in = tokens.expires_in.unwrap_or_default(),
            "Spotify authorization code exchanged successfully"
        );
        Ok(tokens)
    }

    pub async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<SpotifyProfile, ProviderClientError> {
        let resp = self
            .http
            .get(self.cfg.spotify_profile_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let profile: SpotifyProfile = decode_provider_response(resp).await?;
        info!(user_id = %profile.id, "Fetch Spotify profile successfully");
        Ok(profile)
    }
}

async fn decode_provider_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ProviderClientError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    decode_provider_body(status, &body)
}

/// Non-2xx statuses and bodies with an `error` member are provider rejections;
/// anything else that does not fit `T` is a decode failure.
fn decode_provider_body<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, ProviderClientError> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ProviderClientError::Provider {
                status,
                details: Value::String(String::from_utf8_lossy(body).into_owned()),
            });
        }
        Err(e) => return Err(ProviderClientError::Decode(e)),
    };

    if !status.is_success() || value.get("error").is_some() {
        return Err(ProviderClientError::Provider {
            status,
            details: value,
        });
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_body_is_decoded() {
        let tokens: SpotifyTokenResponse = decode_provider_body(
            StatusCode::OK,
            br#"{"access_token":"AT1","refresh_token":"RT1","expires_in":3600,"scope":"user-top-read"}"#,
        )
        .unwrap();
        assert_eq!(tokens.access_token, "AT1");
        assert_eq!(tokens.refresh_token, "RT1");
        assert_eq!(tokens.expires_in, Some(3600));
        assert!(tokens.token_type.is_none());
    }

    #[test]
    fn error_member_is_a_provider_error_even_on_success() {
        let err = decode_provider_body::<SpotifyTokenResponse>(
            StatusCode::OK,
            br#"{"error":"invalid_grant"}"#,
        )
        .unwrap_err();
        match err {
            ProviderClientError::Provider { status, details } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(details["error"], "invalid_grant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_error_status_keeps_raw_body() {
        let err = decode_provider_body::<SpotifyProfile>(StatusCode::BAD_GATEWAY, b"upstream down")
            .unwrap_err();
        match err {
            ProviderClientError::Provider { status, details } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(details, Value::String("upstream down".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let err = decode_provider_body::<SpotifyTokenResponse>(StatusCode::OK, b"<html>")
            .unwrap_err();
        assert!(matches!(err, ProviderClientError::Decode(_)));

        // Valid JSON without a refresh token does not satisfy the exchange contract.
        let err = decode_provider_body::<SpotifyTokenResponse>(
            StatusCode::OK,
            br#"{"access_token":"AT1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderClientError::Decode(_)));
    }

    #[test]
    fn authorize_url_carries_client_parameters() {
        let cfg = Config {
            client_id: "client-1".to_string(),
            ..Config::default()
        };
        let endpoints = SpotifyEndpoints::new(Arc::new(cfg), reqwest::Client::new());
        let url = endpoints.build_authorize_url("abc123");

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("client_id"), Some("client-1"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:8080/callback"));
        assert_eq!(get("state"), Some("abc123"));
        assert_eq!(get("scope"), Some("user-read-recently-played user-top-read"));
    }
}
