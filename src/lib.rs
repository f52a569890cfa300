pub mod apple;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod router;
pub mod service;
pub mod spotify;
pub mod types;

pub use error::FhonkError;
pub use service::spotify_connect::SpotifyConnectService;
