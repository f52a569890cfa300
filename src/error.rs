use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Failure of a single outbound call to the provider (token endpoint or profile endpoint).
#[derive(Debug, ThisError)]
pub enum ProviderClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider responded {status} with {details}")]
    Provider { status: StatusCode, details: Value },

    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, ThisError)]
pub enum FhonkError {
    #[error("missing authorization code")]
    MissingCode,

    #[error("state mismatch")]
    StateMismatch,

    #[error("state is already pending")]
    StateInUse,

    #[error("too many pending authorizations")]
    TooManyPendingAuthorizations,

    #[error("invalid callback body: {0}")]
    InvalidCallbackBody(String),

    #[error("redirect target not allowed: {0}")]
    InvalidRedirectTarget(String),

    #[error("authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("token exchange failed: {0}")]
    ExchangeFailed(#[source] ProviderClientError),

    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(#[source] ProviderClientError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("developer token unavailable: {0}")]
    DeveloperTokenUnavailable(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderClientError {
    fn status_and_body(self) -> (StatusCode, ApiErrorBody) {
        match self {
            ProviderClientError::Transport(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("TRANSPORT_ERROR", "Provider is unreachable."),
            ),
            ProviderClientError::Provider { status, details } => {
                let status = if status.is_server_error() {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::BAD_REQUEST
                };
                (
                    status,
                    ApiErrorBody::new("PROVIDER_ERROR", "Spotify API error.").with_details(details),
                )
            }
            ProviderClientError::Decode(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("DECODE_ERROR", "Provider returned an unreadable response."),
            ),
        }
    }
}

impl IntoResponse for FhonkError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            FhonkError::MissingCode => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("MISSING_CODE", "Missing authorization code."),
            ),
            FhonkError::StateMismatch => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("STATE_MISMATCH", "State mismatch."),
            ),
            FhonkError::StateInUse => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("STATE_IN_USE", "State is already pending."),
            ),
            FhonkError::TooManyPendingAuthorizations => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody::new(
                    "PENDING_LIMIT_REACHED",
                    "Too many authorizations in progress, try again later.",
                ),
            ),
            FhonkError::InvalidCallbackBody(reason) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("INVALID_BODY", "Callback body must be a JSON object.")
                    .with_details(Value::String(reason)),
            ),
            FhonkError::InvalidRedirectTarget(target) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("INVALID_REDIRECT", "Redirect target is not allowed.")
                    .with_details(Value::String(target)),
            ),
            FhonkError::AuthorizationDenied(reason) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("AUTHORIZATION_DENIED", "Authorization was denied.")
                    .with_details(Value::String(reason)),
            ),
            FhonkError::ExchangeFailed(inner) | FhonkError::ProfileFetchFailed(inner) => {
                inner.status_and_body()
            }
            FhonkError::DeveloperTokenUnavailable(_) | FhonkError::Jwt(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new(
                    "DEVELOPER_TOKEN_UNAVAILABLE",
                    "Failed to generate developer token.",
                ),
            ),
            FhonkError::Database(_)
            | FhonkError::HttpClient(_)
            | FhonkError::Config(_)
            | FhonkError::InvalidConfig(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorBody {
    fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn render(err: FhonkError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_client_errors() {
        let (status, body) = render(FhonkError::MissingCode).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_CODE");
        assert!(body["error"].get("details").is_none());

        let (status, body) = render(FhonkError::StateMismatch).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "STATE_MISMATCH");

        let (status, body) = render(FhonkError::StateInUse).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "STATE_IN_USE");

        let (status, body) = render(FhonkError::TooManyPendingAuthorizations).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "PENDING_LIMIT_REACHED");
    }

    #[tokio::test]
    async fn provider_rejection_carries_details() {
        let err = FhonkError::ExchangeFailed(ProviderClientError::Provider {
            status: StatusCode::BAD_REQUEST,
            details: json!({"error": "invalid_grant"}),
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "PROVIDER_ERROR");
        assert_eq!(body["error"]["details"]["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn provider_outage_is_bad_gateway() {
        let err = FhonkError::ProfileFetchFailed(ProviderClientError::Provider {
            status: StatusCode::SERVICE_UNAVAILABLE,
            details: Value::String("down".to_string()),
        });
        let (status, _) = render(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let decode = serde_json::from_str::<Value>("not json").unwrap_err();
        let (status, body) = render(FhonkError::ExchangeFailed(decode.into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "DECODE_ERROR");
    }
}
