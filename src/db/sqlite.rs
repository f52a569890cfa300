use crate::db::models::{DbCredentialRecord, NewCredentialRecord};
use crate::db::schema::SQLITE_INIT;
use crate::error::FhonkError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub type SqlitePool = Pool<Sqlite>;

const SELECT_CREDENTIAL: &str = r#"SELECT id, user_id, display_name, access_token, refresh_token,
       account_id, created_at, updated_at
       FROM spotify_credential WHERE user_id = ?"#;

#[derive(Clone)]
pub struct CredentialsStorage {
    pool: SqlitePool,
}

impl CredentialsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and initialize the schema.
    pub async fn connect(database_url: &str) -> Result<Self, FhonkError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .max_lifetime(Duration::from_secs(60 * 60))
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), FhonkError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Upsert by unique user_id and return the stored row.
    /// A reconnect overwrites display name, tokens and `updated_at`; `created_at` is kept.
    pub async fn upsert(
        &self,
        record: NewCredentialRecord,
    ) -> Result<DbCredentialRecord, FhonkError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO spotify_credential (
                user_id, display_name, access_token, refresh_token, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name=excluded.display_name,
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&record.user_id)
        .bind(record.display_name)
        .bind(record.access_token)
        .bind(record.refresh_token)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_user_id(&record.user_id).await
    }

    pub async fn get_by_user_id(&self, user_id: &str) -> Result<DbCredentialRecord, FhonkError> {
        let record = sqlx::query_as::<_, DbCredentialRecord>(SELECT_CREDENTIAL)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }
}
