use crate::service::spotify_connect::{AuthorizeRequest, CallbackOutcome, CallbackParams};
use crate::types::TokenPair;
use crate::{FhonkError, router::FhonkState};
use axum::{
    Json,
    extract::{FromRequest, Query, Request, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub state: Option<String>,
    pub redirect_to: Option<String>,
    pub user_id: Option<String>,
}

/// Query parameters Spotify appends when redirecting the browser back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// JSON body posted by a frontend that received the redirect itself.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// [`CallbackBody`] extractor whose rejections use the API error envelope.
pub struct CallbackPayload(pub CallbackBody);

impl<S> FromRequest<S> for CallbackPayload
where
    S: Send + Sync,
{
    type Rejection = FhonkError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<CallbackBody>::from_request(req, state)
            .await
            .map_err(|rejection| FhonkError::InvalidCallbackBody(rejection.body_text()))?;
        Ok(Self(body))
    }
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl From<CallbackOutcome> for CallbackResponse {
    fn from(outcome: CallbackOutcome) -> Self {
        Self {
            warning: outcome.persistence.warning(),
            tokens: outcome.tokens,
        }
    }
}

/// GET /api/v1/auth/spotify -> redirects to Spotify's consent page.
pub async fn spotify_login(
    State(state): State<FhonkState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Redirect, FhonkError> {
    let auth_url = state.spotify.begin_authorization(AuthorizeRequest {
        state: query.state,
        redirect_to: query.redirect_to,
        user_id: query.user_id,
    })?;

    info!("Dispatching Spotify OAuth redirect");
    Ok(Redirect::temporary(auth_url.as_str()))
}

/// GET /api/v1/auth/spotify/callback -> browser flow: exchange, then redirect to the frontend.
/// Answers JSON when no frontend is known.
pub async fn spotify_callback_redirect(
    State(state): State<FhonkState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, FhonkError> {
    if let Some(reason) = query.error {
        return Err(state.spotify.deny(query.state.as_deref(), reason));
    }

    let outcome = state
        .spotify
        .complete(CallbackParams {
            code: query.code.unwrap_or_default(),
            state: query.state.unwrap_or_default(),
        })
        .await?;

    let target = state.spotify.redirect_target(&outcome).cloned();
    match target {
        Some(target) => {
            let location = outcome.redirect_url(&target);
            info!(user_id = ?outcome.user_id, "Spotify connected, redirecting to frontend");
            Ok(Redirect::temporary(location.as_str()).into_response())
        }
        None => {
            info!(user_id = ?outcome.user_id, "Spotify connected");
            Ok(Json(CallbackResponse::from(outcome)).into_response())
        }
    }
}

/// POST /api/v1/auth/spotify/callback -> API flow: `{code, state}` in, tokens out.
pub async fn spotify_callback_json(
    State(state): State<FhonkState>,
    CallbackPayload(body): CallbackPayload,
) -> Result<Json<CallbackResponse>, FhonkError> {
    let outcome = state
        .spotify
        .complete(CallbackParams {
            code: body.code.unwrap_or_default(),
            state: body.state.unwrap_or_default(),
        })
        .await?;

    info!(user_id = ?outcome.user_id, "Spotify connected");
    Ok(Json(outcome.into()))
}
