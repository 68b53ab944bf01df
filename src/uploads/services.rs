use anyhow::Context;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo_types::FileRecord;
use crate::{
    db::now_utc,
    error::AppError,
    state::AppState,
    tabular::{self, Table, TableSummary},
};

pub const PREVIEW_ROWS: usize = 100;
const CSV_CONTENT_TYPE: &str = "text/csv";

/// An accepted upload: what was stored plus what validation saw.
pub struct StoredUpload {
    pub record: FileRecord,
    pub summary: TableSummary,
    pub preview: Vec<Map<String, Value>>,
}

/// Boundary checks applied before any bytes are parsed or stored.
pub fn check_upload(filename: &str, size: usize, max_size: usize) -> Result<(), AppError> {
    if !has_csv_extension(filename) {
        return Err(AppError::UnsupportedFileType);
    }
    if size > max_size {
        return Err(AppError::PayloadTooLarge { limit: max_size });
    }
    Ok(())
}

fn has_csv_extension(filename: &str) -> bool {
    let name = filename.trim();
    name.len() > ".csv".len()
        && name
            .get(name.len() - 4..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".csv"))
}

/// Blob key for a file. Built only from generated ids.
fn storage_key(user_id: Uuid, file_id: Uuid) -> String {
    format!("csv/{}/{}.csv", user_id, file_id)
}

/// Validates, persists the bytes, then records the file for `user_id`.
pub async fn store(
    st: &AppState,
    user_id: Uuid,
    filename: &str,
    body: Bytes,
) -> Result<StoredUpload, AppError> {
    let data = body.clone();
    let (summary, preview) = tokio::task::spawn_blocking(move || {
        tabular::validate(&data).map(|(table, summary)| (summary, table.preview(PREVIEW_ROWS)))
    })
    .await
    .context("csv validation task")??;

    let file_id = Uuid::new_v4();
    let key = storage_key(user_id, file_id);
    let record = FileRecord {
        id: file_id,
        user_id,
        filename: filename.trim().to_string(),
        columns: summary.columns.clone(),
        row_count: summary.row_count as i64,
        file_size: body.len() as i64,
        uploaded_at: now_utc(),
        storage_key: key.clone(),
    };

    st.storage
        .put_object(&key, body, CSV_CONTENT_TYPE)
        .await
        .with_context(|| format!("put_object {}", key))?;

    if let Err(e) = st.repo.insert_file(&record).await {
        if let Err(cleanup) = st.storage.delete_object(&key).await {
            error!(error = %cleanup, key = %key, "orphaned blob after failed insert");
        }
        return Err(e.into());
    }

    info!(user_id = %user_id, file_id = %file_id, rows = record.row_count, "csv stored");
    Ok(StoredUpload {
        record,
        summary,
        preview,
    })
}

pub async fn list_for(st: &AppState, user_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
    Ok(st.repo.list_files(user_id).await?)
}

/// A file owned by `user_id`; someone else's file is reported as missing.
pub async fn get(st: &AppState, user_id: Uuid, file_id: Uuid) -> Result<FileRecord, AppError> {
    st.repo
        .find_file(user_id, file_id)
        .await?
        .ok_or(AppError::FileNotFound)
}

/// Same as [`get`] but for an id straight off the wire.
pub async fn get_by_raw_id(st: &AppState, user_id: Uuid, raw_id: &str) -> Result<FileRecord, AppError> {
    let file_id = Uuid::parse_str(raw_id.trim()).map_err(|_| AppError::FileNotFound)?;
    get(st, user_id, file_id).await
}

/// Reads a stored file's bytes back and parses them.
pub async fn load_table(st: &AppState, record: &FileRecord) -> Result<Table, AppError> {
    let Some(bytes) = st.storage.get_object(&record.storage_key).await? else {
        warn!(file_id = %record.id, key = %record.storage_key, "blob missing for file record");
        return Err(AppError::FileNotFound);
    };
    let table = tokio::task::spawn_blocking(move || Table::parse(&bytes))
        .await
        .context("csv parse task")??;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX_BY_TEN: &str = "a,b,c,d,e,f\n\
        1,2,3,4,5,6\n2,3,4,5,6,7\n3,4,5,6,7,8\n4,5,6,7,8,9\n5,6,7,8,9,10\n\
        6,7,8,9,10,11\n7,8,9,10,11,12\n8,9,10,11,12,13\n9,10,11,12,13,14\n10,11,12,13,14,15\n";

    #[test]
    fn boundary_checks() {
        assert!(check_upload("data.csv", 10, 100).is_ok());
        assert!(check_upload("DATA.CSV", 10, 100).is_ok());
        assert!(matches!(
            check_upload("data.xlsx", 10, 100),
            Err(AppError::UnsupportedFileType)
        ));
        assert!(matches!(check_upload(".csv", 10, 100), Err(AppError::UnsupportedFileType)));
        assert!(matches!(
            check_upload("data.csv", 101, 100),
            Err(AppError::PayloadTooLarge { limit: 100 })
        ));
    }

    #[test]
    fn storage_key_ignores_filename() {
        let u = Uuid::new_v4();
        let f = Uuid::new_v4();
        assert_eq!(storage_key(u, f), format!("csv/{u}/{f}.csv"));
    }

    #[tokio::test]
    async fn store_then_list_round_trip() {
        let st = AppState::fake();
        let user = Uuid::new_v4();
        let stored = store(&st, user, "six.csv", Bytes::from_static(SIX_BY_TEN.as_bytes()))
            .await
            .expect("store");
        assert_eq!(stored.summary.row_count, 10);
        assert_eq!(stored.summary.numeric_columns.len(), 6);
        assert_eq!(stored.preview.len(), 10);
        assert_eq!(stored.record.file_size, SIX_BY_TEN.len() as i64);

        let files = list_for(&st, user).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].columns, vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(files[0].row_count, 10);

        let table = load_table(&st, &files[0]).await.expect("load");
        assert_eq!(table.row_count(), 10);
    }

    #[tokio::test]
    async fn invalid_csv_is_not_stored() {
        let st = AppState::fake();
        let user = Uuid::new_v4();
        let err = store(&st, user, "bad.csv", Bytes::from_static(b"a,b\n1,2\n"))
            .await
            .err()
            .expect("rejected");
        assert!(matches!(err, AppError::TooFewColumns { .. }));
        assert!(list_for(&st, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn files_are_private_to_their_owner() {
        let st = AppState::fake();
        let owner = Uuid::new_v4();
        let stored = store(&st, owner, "six.csv", Bytes::from_static(SIX_BY_TEN.as_bytes()))
            .await
            .unwrap();

        assert!(get(&st, owner, stored.record.id).await.is_ok());
        assert!(matches!(
            get(&st, Uuid::new_v4(), stored.record.id).await,
            Err(AppError::FileNotFound)
        ));
        assert!(matches!(
            get_by_raw_id(&st, owner, "not-a-uuid").await,
            Err(AppError::FileNotFound)
        ));
    }

    #[tokio::test]
    async fn failed_insert_removes_the_blob() {
        use std::sync::{Arc, Mutex};

        use async_trait::async_trait;

        use crate::auth::repo_types::User;
        use crate::db::Repository;

        /// Accepts users but refuses every file, remembering what it refused.
        #[derive(Default)]
        struct RefusingFiles {
            refused: Mutex<Option<FileRecord>>,
        }

        #[async_trait]
        impl Repository for RefusingFiles {
            async fn insert_user(&self, _user: &User) -> Result<(), AppError> {
                Ok(())
            }
            async fn find_user_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
                Ok(None)
            }
            async fn find_user_by_id(&self, _id: Uuid) -> anyhow::Result<Option<User>> {
                Ok(None)
            }
            async fn insert_file(&self, file: &FileRecord) -> anyhow::Result<()> {
                *self.refused.lock().unwrap() = Some(file.clone());
                anyhow::bail!("connection reset")
            }
            async fn list_files(&self, _user_id: Uuid) -> anyhow::Result<Vec<FileRecord>> {
                Ok(Vec::new())
            }
            async fn find_file(&self, _user_id: Uuid, _file_id: Uuid) -> anyhow::Result<Option<FileRecord>> {
                Ok(None)
            }
        }

        let base = AppState::fake();
        let repo = Arc::new(RefusingFiles::default());
        let st = AppState::from_parts(repo.clone(), base.config.clone(), base.storage.clone());

        let err = store(&st, Uuid::new_v4(), "six.csv", Bytes::from_static(SIX_BY_TEN.as_bytes()))
            .await
            .err()
            .expect("insert failure surfaces");
        assert!(matches!(err, AppError::Internal(_)));

        let refused = repo.refused.lock().unwrap().clone().expect("insert was attempted");
        assert_eq!(st.storage.get_object(&refused.storage_key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_blob_is_file_not_found() {
        let st = AppState::fake();
        let owner = Uuid::new_v4();
        let stored = store(&st, owner, "six.csv", Bytes::from_static(SIX_BY_TEN.as_bytes()))
            .await
            .unwrap();
        st.storage.delete_object(&stored.record.storage_key).await.unwrap();
        assert!(matches!(
            load_table(&st, &stored.record).await,
            Err(AppError::FileNotFound)
        ));
    }
}
