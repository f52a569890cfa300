pub mod apple_music;
pub mod health;
pub mod spotify_oauth;
