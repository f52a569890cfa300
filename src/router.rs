use crate::apple::DeveloperTokenSigner;
use crate::config::{API_VERSION, APP_NAME, Config};
use crate::db::CredentialsStorage;
use crate::error::FhonkError;
use crate::handlers::{apple_music, health, spotify_oauth};
use crate::service::spotify_connect::SpotifyConnectService;

use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK},
    },
    routing::get,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

#[derive(Clone)]
pub struct FhonkState {
    pub cfg: Arc<Config>,
    pub spotify: Arc<SpotifyConnectService>,
    pub apple: Option<Arc<DeveloperTokenSigner>>,
}

impl FhonkState {
    pub fn new(cfg: Arc<Config>, storage: CredentialsStorage) -> Result<Self, FhonkError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.http_timeout())
            .build()
            .map_err(FhonkError::HttpClient)?;

        let apple = DeveloperTokenSigner::from_config(&cfg)
            .inspect_err(|e| warn!(error = %e, "Apple Music developer tokens disabled"))
            .ok()
            .map(Arc::new);

        let spotify = Arc::new(SpotifyConnectService::new(cfg.clone(), http, storage));

        Ok(Self {
            cfg,
            spotify,
            apple,
        })
    }
}

pub fn fhonk_router(state: FhonkState) -> Router {
    let auth = Router::new()
        .route("/apple", get(apple_music::developer_token))
        .route("/spotify", get(spotify_oauth::spotify_login))
        .route(
            "/spotify/callback",
            get(spotify_oauth::spotify_callback_redirect)
                .post(spotify_oauth::spotify_callback_json),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest(&format!("/api/{API_VERSION}/auth"), auth)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([LINK])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}
