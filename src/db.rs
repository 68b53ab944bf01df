use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::repo_types::User, error::AppError, uploads::repo_types::FileRecord};

/// Record store for users and their file metadata.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Appends a file to its owner's list.
    async fn insert_file(&self, file: &FileRecord) -> anyhow::Result<()>;
    async fn list_files(&self, user_id: Uuid) -> anyhow::Result<Vec<FileRecord>>;
    async fn find_file(&self, user_id: Uuid, file_id: Uuid) -> anyhow::Result<Option<FileRecord>>;
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        user.insert(&self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        User::find_by_email(&self.pool, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn insert_file(&self, file: &FileRecord) -> anyhow::Result<()> {
        file.insert(&self.pool).await
    }

    async fn list_files(&self, user_id: Uuid) -> anyhow::Result<Vec<FileRecord>> {
        FileRecord::list_by_user(&self.pool, user_id).await
    }

    async fn find_file(&self, user_id: Uuid, file_id: Uuid) -> anyhow::Result<Option<FileRecord>> {
        FileRecord::find_owned(&self.pool, user_id, file_id).await
    }
}

/// Current UTC time at the precision Postgres stores (microseconds), so a
/// record reads back exactly as it was written.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
