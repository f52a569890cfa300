pub mod spotify;

pub use spotify::{SpotifyProfile, SpotifyTokenResponse, TokenPair};
