pub mod developer_token;

pub use developer_token::{DeveloperTokenClaims, DeveloperTokenSigner};
