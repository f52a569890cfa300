use crate::config::Config;
use crate::db::{CredentialsStorage, NewCredentialRecord};
use crate::error::FhonkError;
use crate::spotify::{
    PendingAuthorization, PendingAuthorizations, PendingInsertError, SpotifyEndpoints,
};
use crate::types::TokenPair;

use oauth2::CsrfToken;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Parameters accepted by the authorize endpoint.
#[derive(Debug, Default, Clone)]
pub struct AuthorizeRequest {
    /// Caller-chosen nonce; a random one is generated when absent.
    pub state: Option<String>,
    /// Where the browser should land after the callback (same origin as `FRONTEND_URL`).
    pub redirect_to: Option<String>,
    /// Record key used when the profile fetch is disabled.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Stored,
    /// No record key was known (profile fetch disabled and no caller-supplied id).
    Skipped,
    /// The tokens were obtained but could not be written.
    Failed,
}

impl Persistence {
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Persistence::Failed => Some("persist_failed"),
            Persistence::Stored | Persistence::Skipped => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub tokens: TokenPair,
    pub user_id: Option<String>,
    pub persistence: Persistence,
    pub redirect_to: Option<Url>,
}

impl CallbackOutcome {
    /// `target` with the tokens (and a persistence warning, if any) appended as query parameters.
    pub fn redirect_url(&self, target: &Url) -> Url {
        let mut url = target.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("access_token", &self.tokens.access_token)
                .append_pair("refresh_token", &self.tokens.refresh_token);
            if let Some(warning) = self.persistence.warning() {
                query.append_pair("warning", warning);
            }
        }
        url
    }
}

/// Drives the Spotify connect flow: authorize redirect, then code exchange,
/// profile lookup and credential upsert on callback.
pub struct SpotifyConnectService {
    endpoints: SpotifyEndpoints,
    pending: PendingAuthorizations,
    storage: CredentialsStorage,
    frontend_url: Option<Url>,
    verify_state: bool,
    fetch_profile: bool,
}

impl SpotifyConnectService {
    pub fn new(cfg: Arc<Config>, http: reqwest::Client, storage: CredentialsStorage) -> Self {
        Self {
            pending: PendingAuthorizations::new(cfg.state_ttl(), cfg.max_pending_states),
            frontend_url: cfg.frontend_url.clone(),
            verify_state: cfg.verify_state,
            fetch_profile: cfg.fetch_profile,
            endpoints: SpotifyEndpoints::new(cfg, http),
            storage,
        }
    }

    pub fn pending(&self) -> &PendingAuthorizations {
        &self.pending
    }

    /// Register a pending authorization and return the Spotify authorize URL for it.
    pub fn begin_authorization(&self, req: AuthorizeRequest) -> Result<Url, FhonkError> {
        let redirect_to = req
            .redirect_to
            .as_deref()
            .map(|target| allowed_redirect(self.frontend_url.as_ref(), target))
            .transpose()?;

        let state = req
            .state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| CsrfToken::new_random().secret().to_owned());

        let auth_url = self.endpoints.build_authorize_url(&state);
        self.pending
            .insert(state, PendingAuthorization::new(redirect_to, req.user_id))
            .map_err(|e| {
                warn!(error = %e, "Refusing authorize request");
                match e {
                    PendingInsertError::InUse => FhonkError::StateInUse,
                    PendingInsertError::Full => FhonkError::TooManyPendingAuthorizations,
                }
            })?;
        Ok(auth_url)
    }

    /// The user refused consent; drop the pending state and report the provider's reason.
    pub fn deny(&self, state: Option<&str>, reason: String) -> FhonkError {
        if let Some(state) = state {
            self.pending.take(state);
        }
        warn!(reason = %reason, "Spotify authorization denied");
        FhonkError::AuthorizationDenied(reason)
    }

    /// Validate, exchange, enrich, persist. Terminal on the first failure; nothing is retried.
    pub async fn complete(&self, params: CallbackParams) -> Result<CallbackOutcome, FhonkError> {
        if params.code.trim().is_empty() {
            warn!("Empty authorization code received");
            return Err(FhonkError::MissingCode);
        }

        let pending = self.claim_state(&params.state)?;

        let tokens: TokenPair = self
            .endpoints
            .exchange_authorization_code(&params.code)
            .await
            .inspect_err(|e| warn!(error = %e, "Spotify token exchange failed"))
            .map_err(FhonkError::ExchangeFailed)?
            .into();

        let (user_id, display_name) = if self.fetch_profile {
            let profile = self
                .endpoints
                .fetch_profile(&tokens.access_token)
                .await
                .inspect_err(|e| warn!(error = %e, "Spotify profile fetch failed"))
                .map_err(FhonkError::ProfileFetchFailed)?;
            (Some(profile.id), profile.display_name)
        } else {
            (pending.as_ref().and_then(|p| p.user_id.clone()), None)
        };

        let persistence = match user_id.as_deref() {
            Some(uid) => self.persist(uid, display_name, &tokens).await,
            None => Persistence::Skipped,
        };

        Ok(CallbackOutcome {
            tokens,
            user_id,
            persistence,
            redirect_to: pending.and_then(|p| p.redirect_to),
        })
    }

    /// Where a browser-facing callback should send the user, if anywhere.
    pub fn redirect_target<'a>(&'a self, outcome: &'a CallbackOutcome) -> Option<&'a Url> {
        outcome.redirect_to.as_ref().or(self.frontend_url.as_ref())
    }

    fn claim_state(&self, state: &str) -> Result<Option<PendingAuthorization>, FhonkError> {
        if !self.verify_state {
            return Ok((!state.is_empty())
                .then(|| self.pending.take(state))
                .flatten());
        }
        if state.is_empty() {
            warn!("Callback without state");
            return Err(FhonkError::StateMismatch);
        }
        match self.pending.take(state) {
            Some(pending) => Ok(Some(pending)),
            None => {
                warn!("State mismatch: unknown, expired or already used state");
                Err(FhonkError::StateMismatch)
            }
        }
    }

    async fn persist(
        &self,
        user_id: &str,
        display_name: Option<String>,
        tokens: &TokenPair,
    ) -> Persistence {
        let record = NewCredentialRecord {
            user_id: user_id.to_string(),
            display_name: display_name.unwrap_or_else(|| user_id.to_string()),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        };
        match self.storage.upsert(record).await {
            Ok(stored) => {
                info!(user_id = %stored.user_id, id = stored.id, "Spotify credential stored");
                Persistence::Stored
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to persist Spotify credential");
                Persistence::Failed
            }
        }
    }
}

/// `target` is accepted only when it shares the origin of the configured frontend.
fn allowed_redirect(frontend: Option<&Url>, target: &str) -> Result<Url, FhonkError> {
    let reject = || FhonkError::InvalidRedirectTarget(target.to_string());
    let frontend = frontend.ok_or_else(reject)?;
    let parsed = Url::parse(target).map_err(|_| reject())?;
    if parsed.origin() != frontend.origin() {
        return Err(reject());
    }
    Ok(parsed)
}
