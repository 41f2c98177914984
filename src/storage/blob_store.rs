//! Path-addressed blob storage under the public-serving root.
//!
//! A blob uploaded as `avatar.png` with the default prefix lands at
//! `<public_dir>/uploads/user/avatar.png` and is addressed as
//! `./uploads/user/avatar.png`, which is also the URL the static file
//! service answers for it. Names are not deduplicated: writing the same name
//! twice keeps the last payload.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, Result};
use crate::models::IncomingFile;

/// Maps an upload to the file name it is stored under.
pub type NameResolver = fn(&IncomingFile) -> String;

/// Keeps the client's file name, minus any directory components it sent.
pub fn original_file_name(file: &IncomingFile) -> String {
    file.original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Where a blob ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub filename: String,
    /// `./<prefix>/<filename>`, relative to the public root.
    pub path: String,
    /// Location on disk.
    pub local_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    public_dir: PathBuf,
    upload_path: String,
    resolve_name: NameResolver,
}

impl BlobStore {
    pub fn new(public_dir: PathBuf, upload_path: impl Into<String>) -> Self {
        Self::with_name_resolver(public_dir, upload_path, original_file_name)
    }

    pub fn with_name_resolver(
        public_dir: PathBuf,
        upload_path: impl Into<String>,
        resolve_name: NameResolver,
    ) -> Self {
        Self {
            public_dir,
            upload_path: crate::config::normalize_upload_path(&upload_path.into()),
            resolve_name,
        }
    }

    /// Creates the upload directory. Only called at startup; writes never create it.
    pub async fn initialize(&self) -> Result<()> {
        let dir = self.upload_dir();
        fs::create_dir_all(&dir).await?;
        tracing::info!("Blob store initialized at: {:?}", dir);
        Ok(())
    }

    /// Writes the payload verbatim under the resolved name.
    pub async fn store(&self, file: &IncomingFile) -> Result<StoredBlob> {
        let filename = (self.resolve_name)(file);
        self.write_named(&filename, &file.bytes).await
    }

    /// Reads a blob back by its `./<prefix>/<name>` path.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let local_path = self.resolve_path(path);
        match fs::read(&local_path).await {
            Ok(data) => {
                tracing::debug!("Read blob: {} ({} bytes)", path, data.len());
                Ok(data)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::BlobNotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes `data` as a new blob named `new_name` next to the uploads.
    pub async fn duplicate(&self, data: &[u8], new_name: &str) -> Result<StoredBlob> {
        self.write_named(new_name, data).await
    }

    /// Lists the upload directory, one level deep, as `./<prefix>/<name>` paths.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.list_dir(&self.upload_path).await
    }

    /// Lists files directly inside `directory` (a path relative to the public
    /// root), each re-expressed as `./<directory>/<name>`.
    pub async fn list_dir(&self, directory: &str) -> Result<Vec<String>> {
        let prefix = crate::config::normalize_upload_path(directory);
        let dir = self.resolve_path(&prefix);
        let mut entries = fs::read_dir(&dir).await.map_err(|err| {
            tracing::error!("Could not list the directory {:?}: {}", dir, err);
            err
        })?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                paths.push(format!("{prefix}/{name}"));
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.resolve_path(&self.upload_path)
    }

    pub fn relative_path(&self, filename: &str) -> String {
        format!("{}/{}", self.upload_path, filename)
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let normalized = path.trim_start_matches("./").trim_start_matches('/');
        if normalized.is_empty() || normalized == "." {
            return self.public_dir.clone();
        }
        self.public_dir.join(Path::new(normalized))
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    async fn write_named(&self, filename: &str, data: &[u8]) -> Result<StoredBlob> {
        validate_file_name(filename)?;
        let local_path = self.upload_dir().join(filename);
        fs::write(&local_path, data).await?;
        tracing::debug!("Wrote blob: {:?} ({} bytes)", local_path, data.len());
        Ok(StoredBlob {
            filename: filename.to_string(),
            path: self.relative_path(filename),
            local_path,
        })
    }
}

fn validate_file_name(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if invalid {
        return Err(AppError::InvalidFileName(filename.to_string()));
    }
    Ok(())
}
