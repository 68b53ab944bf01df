use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata for one uploaded CSV. The bytes live in blob storage under
/// `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub columns: Vec<String>,
    pub row_count: i64,
    pub file_size: i64,
    pub uploaded_at: OffsetDateTime,
    #[serde(skip_serializing)]
    pub storage_key: String,
}

impl FileRecord {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}
