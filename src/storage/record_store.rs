//! Document collection of user records.
//!
//! Each record is a JSON document at `<data_dir>/users/<id>.json`. The whole
//! collection is mirrored in memory; creates hold the lock across the
//! uniqueness check and the write, so two racing inserts with one email
//! cannot both succeed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{NewUser, UserRecord};
use crate::storage::hash::{is_record_id, record_id};

const COLLECTION: &str = "users";

pub struct RecordStore {
    dir: PathBuf,
    records: Mutex<Vec<UserRecord>>,
}

impl RecordStore {
    /// Opens (creating if needed) the collection under `data_dir` and loads it.
    /// Fails if any document in the collection cannot be parsed.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join(COLLECTION);
        fs::create_dir_all(&dir).await?;

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            // every stored email takes part in the uniqueness check
            let record = serde_json::from_slice::<UserRecord>(&bytes).map_err(|err| {
                tracing::error!("Unreadable record {:?}: {}", path, err);
                err
            })?;
            records.push(record);
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        tracing::info!("Loaded {} records from {:?}", records.len(), dir);
        Ok(Self {
            dir,
            records: Mutex::new(records),
        })
    }

    pub async fn create(&self, fields: NewUser) -> Result<UserRecord> {
        let name = required(fields.name, "name")?;
        let email = required(fields.email, "email")?;

        let mut records = self.records.lock().await;
        if records.iter().any(|record| record.email == email) {
            return Err(AppError::DuplicateEmail(email));
        }

        let created_at = Utc::now();
        let nanos = created_at.timestamp_nanos_opt().unwrap_or_default();
        let mut attempt = 0usize;
        let id = loop {
            let candidate = record_id(&format!("user:{nanos}:{email}:{}:{attempt}", records.len()));
            if !records.iter().any(|record| record.id == candidate) {
                break candidate;
            }
            attempt += 1;
        };

        let record = UserRecord {
            id,
            name,
            email,
            password: fields.password,
            img_path: fields.img_path,
            img_data: fields.img_data,
            img_type: fields.img_type,
            created_at,
        };
        self.write_document(&record).await?;
        records.push(record.clone());

        tracing::info!("Created user record {} <{}>", record.id, record.email);
        Ok(record)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<UserRecord> {
        if !is_record_id(id) {
            return Err(AppError::InvalidId(id.to_string()));
        }
        let records = self.records.lock().await;
        records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// All records in insertion order.
    pub async fn find_all(&self) -> Result<Vec<UserRecord>> {
        Ok(self.records.lock().await.clone())
    }

    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }

    async fn write_document(&self, record: &UserRecord) -> Result<()> {
        let path = self.dir.join(format!("{}.json", record.id));
        let temp_path = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(record)?;
        fs::write(&temp_path, &payload).await?;
        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::MissingField(field))
}
