//! Spotify OAuth: outbound endpoint calls and the server-held pending state store.

pub mod endpoints;
pub mod pending;

pub use endpoints::SpotifyEndpoints;
pub use pending::{PendingAuthorization, PendingAuthorizations, PendingInsertError};
