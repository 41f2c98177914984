use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPLOAD_PATH: &str = "./uploads/user";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Runtime configuration, resolved once at startup and handed to constructors.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Root served read-only by the static file service.
    pub public_dir: PathBuf,
    /// Logical upload prefix, e.g. `./uploads/user`.
    pub upload_path: String,
    /// Root of the document database.
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            public_dir: PathBuf::from("public"),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            data_dir: PathBuf::from("data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = non_blank_var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let max_upload_bytes = non_blank_var("MAX_UPLOAD_BYTES")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);
        Self {
            host: non_blank_var("BIND_HOST").unwrap_or(defaults.host),
            port,
            public_dir: non_blank_var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            upload_path: non_blank_var("UPLOAD_PATH")
                .map(|value| normalize_upload_path(&value))
                .unwrap_or(defaults.upload_path),
            data_dir: non_blank_var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_upload_bytes,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Brings a configured prefix into the `./segment/segment` shape used for `imgPath`.
pub fn normalize_upload_path(raw: &str) -> String {
    let segments: Vec<&str> = raw
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.is_empty() {
        return ".".to_string();
    }
    format!("./{}", segments.join("/"))
}
