use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::FileRecord;

impl FileRecord {
    pub async fn insert(&self, db: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO csv_files
                (id, user_id, filename, columns, row_count, file_size, uploaded_at, storage_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.filename)
        .bind(&self.columns)
        .bind(self.row_count)
        .bind(self.file_size)
        .bind(self.uploaded_at)
        .bind(&self.storage_key)
        .execute(db)
        .await
        .context("insert csv file")?;
        Ok(())
    }

    /// All files of a user in upload order.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, filename, columns, row_count, file_size, uploaded_at, storage_key
              FROM csv_files
             WHERE user_id = $1
             ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list csv files by user")?;
        Ok(rows)
    }

    /// A file only if it belongs to `user_id`.
    pub async fn find_owned(
        db: &PgPool,
        user_id: Uuid,
        file_id: Uuid,
    ) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, filename, columns, row_count, file_size, uploaded_at, storage_key
              FROM csv_files
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("get csv file")?;
        Ok(row)
    }
}
