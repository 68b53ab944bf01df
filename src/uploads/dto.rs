use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{repo_types::FileRecord, services::StoredUpload};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub file_id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub row_count: i64,
    pub file_size: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub data: Vec<Map<String, Value>>, // first rows, for preview
}

impl From<StoredUpload> for UploadResponse {
    fn from(s: StoredUpload) -> Self {
        let r = s.record;
        Self {
            id: r.id,
            file_id: r.id,
            user_id: r.user_id,
            filename: r.filename,
            columns: r.columns,
            numeric_columns: s.summary.numeric_columns,
            row_count: r.row_count,
            file_size: r.file_size,
            uploaded_at: r.uploaded_at,
            data: s.preview,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileListItem {
    pub id: Uuid,
    pub filename: String,
    pub columns: Vec<String>,
    pub row_count: i64,
    pub file_size: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

impl From<FileRecord> for FileListItem {
    fn from(r: FileRecord) -> Self {
        Self {
            id: r.id,
            filename: r.filename,
            columns: r.columns,
            row_count: r.row_count,
            file_size: r.file_size,
            uploaded_at: r.uploaded_at,
        }
    }
}
