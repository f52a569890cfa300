//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: connection setup and the credential record store

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbCredentialRecord, NewCredentialRecord};
pub use schema::SQLITE_INIT;
pub use sqlite::{CredentialsStorage, SqlitePool};
