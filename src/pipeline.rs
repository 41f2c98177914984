//! Turns one upload request into a stored blob and, for `single` and
//! `stream`, a persisted user record.
//!
//! Steps run strictly in sequence and nothing is rolled back: a failure after
//! the blob write leaves the blob on disk, and a failure after record creation
//! leaves the record.

use chrono::Utc;

use crate::error::Result;
use crate::media::data_uri;
use crate::models::{IncomingFile, NewUser, StoredFile, UserRecord};
use crate::storage::{BlobStore, RecordStore};

pub const BULK_MAX_FILES: usize = 4;

/// Result of a stream-mode upload.
#[derive(Debug)]
pub struct StreamUpload {
    pub record: UserRecord,
    /// The timestamped copy. Nothing references it.
    pub duplicate_path: String,
}

pub struct UploadPipeline {
    blobs: BlobStore,
    records: RecordStore,
}

impl UploadPipeline {
    pub fn new(blobs: BlobStore, records: RecordStore) -> Self {
        Self { blobs, records }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Stores the file and creates a record pointing at it.
    pub async fn single(&self, mut form: NewUser, file: IncomingFile) -> Result<UserRecord> {
        let blob = self.blobs.store(&file).await?;
        form.img_path = Some(blob.path);
        self.records.create(form).await
    }

    /// Stores the file, inlines it into the record as a data URI, then writes
    /// a `<epoch-millis>_<original name>` copy after the record exists.
    pub async fn stream(&self, mut form: NewUser, file: IncomingFile) -> Result<StreamUpload> {
        let received_at = Utc::now().timestamp_millis();

        let blob = self.blobs.store(&file).await?;
        let bytes = self.blobs.read(&blob.path).await?;

        form.img_data = Some(data_uri(&file.mime_type, &bytes));
        form.img_path = Some(blob.path);
        form.img_type = Some(file.mime_type.clone());
        let record = self.records.create(form).await?;

        let copy_name = format!("{received_at}_{}", blob.filename);
        let copy = self.blobs.duplicate(&bytes, &copy_name).await?;
        tracing::debug!("Stream upload {} duplicated to {}", record.id, copy.path);

        Ok(StreamUpload {
            record,
            duplicate_path: copy.path,
        })
    }

    /// Stores every file and reports their metadata. No records are created.
    pub async fn bulk(&self, files: Vec<IncomingFile>) -> Result<Vec<StoredFile>> {
        let destination = self.blobs.upload_dir().display().to_string();
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let blob = self.blobs.store(&file).await?;
            stored.push(StoredFile {
                fieldname: file.field_name,
                originalname: file.original_name,
                encoding: "7bit".to_string(),
                mimetype: file.mime_type,
                destination: destination.clone(),
                filename: blob.filename,
                path: blob.local_path.display().to_string(),
                size: file.size_bytes,
            });
        }
        tracing::info!("{} files uploaded", stored.len());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use base64::Engine as _;
    use tempfile::TempDir;

    async fn create_test_pipeline() -> (UploadPipeline, TempDir) {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::new(temp.path().join("public"), "./uploads/user");
        blobs.initialize().await.unwrap();
        let records = RecordStore::open(&temp.path().join("data")).await.unwrap();
        (UploadPipeline::new(blobs, records), temp)
    }

    fn form(name: &str, email: &str) -> NewUser {
        NewUser {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    fn avatar() -> IncomingFile {
        IncomingFile::new("profile", "avatar.png", "image/png", b"ABCDEFGHIJ".to_vec())
    }

    #[tokio::test]
    async fn test_single_links_record_to_blob() {
        let (pipeline, temp) = create_test_pipeline().await;

        let record = pipeline.single(form("Ann", "ann@x.com"), avatar()).await.unwrap();

        assert_eq!(record.img_path.as_deref(), Some("./uploads/user/avatar.png"));
        assert_eq!(record.img_data, None);
        let on_disk = std::fs::read(temp.path().join("public/uploads/user/avatar.png")).unwrap();
        assert_eq!(on_disk, b"ABCDEFGHIJ");
        assert_eq!(pipeline.records().find_by_id(&record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_single_overrides_submitted_img_path() {
        let (pipeline, _temp) = create_test_pipeline().await;

        let mut submitted = form("Ann", "ann@x.com");
        submitted.img_path = Some("./elsewhere.png".to_string());
        let record = pipeline.single(submitted, avatar()).await.unwrap();

        assert_eq!(record.img_path.as_deref(), Some("./uploads/user/avatar.png"));
    }

    #[tokio::test]
    async fn test_single_duplicate_email_keeps_blob() {
        let (pipeline, _temp) = create_test_pipeline().await;

        pipeline.single(form("Ann", "ann@x.com"), avatar()).await.unwrap();
        let second = IncomingFile::new("profile", "other.png", "image/png", b"zz".to_vec());
        let result = pipeline.single(form("Ann", "ann@x.com"), second).await;

        assert!(matches!(result, Err(AppError::DuplicateEmail(_))));
        assert_eq!(pipeline.records().count().await, 1);
        // no compensation: the blob written before the failed insert stays
        assert_eq!(
            pipeline.blobs().read("./uploads/user/other.png").await.unwrap(),
            b"zz"
        );
    }

    #[tokio::test]
    async fn test_stream_inlines_and_duplicates() {
        let (pipeline, _temp) = create_test_pipeline().await;

        let before = Utc::now().timestamp_millis();
        let upload = pipeline.stream(form("Ann", "ann@x.com"), avatar()).await.unwrap();
        let after = Utc::now().timestamp_millis();
        let record = upload.record;

        assert_eq!(record.img_type.as_deref(), Some("image/png"));
        assert_eq!(record.img_path.as_deref(), Some("./uploads/user/avatar.png"));
        let data = record.img_data.as_deref().unwrap();
        let payload = data.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, b"ABCDEFGHIJ");

        let copy_name = upload
            .duplicate_path
            .strip_prefix("./uploads/user/")
            .unwrap();
        let (millis, rest) = copy_name.split_once('_').unwrap();
        let millis: i64 = millis.parse().unwrap();
        assert!(before <= millis && millis <= after);
        assert_eq!(rest, "avatar.png");
        assert_eq!(
            pipeline.blobs().read(&upload.duplicate_path).await.unwrap(),
            b"ABCDEFGHIJ"
        );
    }

    #[tokio::test]
    async fn test_stream_duplicate_email_writes_no_copy() {
        let (pipeline, _temp) = create_test_pipeline().await;

        pipeline.single(form("Ann", "ann@x.com"), avatar()).await.unwrap();
        let result = pipeline.stream(form("Ann", "ann@x.com"), avatar()).await;

        assert!(matches!(result, Err(AppError::DuplicateEmail(_))));
        assert_eq!(
            pipeline.blobs().list().await.unwrap(),
            vec!["./uploads/user/avatar.png"]
        );
    }

    #[tokio::test]
    async fn test_bulk_stores_without_records() {
        let (pipeline, _temp) = create_test_pipeline().await;

        let files = vec![
            IncomingFile::new("profiles", "a.png", "image/png", b"a".to_vec()),
            IncomingFile::new("profiles", "b.jpg", "image/jpeg", b"bb".to_vec()),
        ];
        let stored = pipeline.bulk(files).await.unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].filename, "b.jpg");
        assert_eq!(stored[1].mimetype, "image/jpeg");
        assert_eq!(stored[1].size, 2);
        assert!(stored[0].path.ends_with("a.png"));
        assert_eq!(pipeline.records().count().await, 0);
        assert_eq!(pipeline.blobs().list().await.unwrap().len(), 2);
    }
}
