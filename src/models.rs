use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded file, detached from the multipart request that carried it.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn new(
        field_name: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            field_name: field_name.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len(),
            bytes,
        }
    }
}

/// The submitted form body, as handed to the record store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub img_path: Option<String>,
    pub img_data: Option<String>,
    pub img_type: Option<String>,
}

impl NewUser {
    /// Applies a text part of the form; returns false for fields the schema does not know.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "password" => &mut self.password,
            "imgPath" => &mut self.img_path,
            "imgData" => &mut self.img_data,
            "imgType" => &mut self.img_type,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Where the detail view should load the image from: inline data first, then the stored path.
    pub fn image_src(&self) -> Option<&str> {
        self.img_data.as_deref().or(self.img_path.as_deref())
    }
}

/// File metadata returned by bulk uploads, shaped like multer's file objects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredFile {
    pub fieldname: String,
    pub originalname: String,
    pub encoding: String,
    pub mimetype: String,
    pub destination: String,
    pub filename: String,
    pub path: String,
    pub size: usize,
}
