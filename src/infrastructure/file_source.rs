use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::domain::error::{AppError, Result};

pub const CSV_MIME_TYPE: &str = "text/csv";

/// A user-selected file. Reads are the only await points of a conversion.
#[async_trait]
pub trait FileSource: Send + Sync {
    fn file_name(&self) -> &str;

    fn mime_type(&self) -> Option<&str>;

    async fn read_prefix(&self, max_bytes: usize) -> Result<Vec<u8>>;

    async fn read_all(&self) -> Result<Vec<u8>>;
}

/// Accept `text/csv` uploads or names ending in `.csv`
pub fn validate_csv_source(source: &dyn FileSource) -> Result<()> {
    let name = source.file_name().trim();
    if name.is_empty() {
        return Err(AppError::ValidationError(
            "Please select a CSV file".to_string(),
        ));
    }

    let mime_ok = source
        .mime_type()
        .map(|mime| mime.trim().eq_ignore_ascii_case(CSV_MIME_TYPE))
        .unwrap_or(false);
    let extension_ok = name.to_lowercase().ends_with(".csv");

    if mime_ok || extension_ok {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "'{}' is not a CSV file",
            name
        )))
    }
}

/// File bytes already held in memory, e.g. an HTTP upload
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    name: String,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }
}

#[async_trait]
impl FileSource for InMemoryFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    async fn read_prefix(&self, max_bytes: usize) -> Result<Vec<u8>> {
        Ok(self.bytes[..self.bytes.len().min(max_bytes)].to_vec())
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// A file on local disk, read lazily
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { path, name }
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        None
    }

    async fn read_prefix(&self, max_bytes: usize) -> Result<Vec<u8>> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            AppError::IoError(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        let mut buffer = Vec::new();
        file.take(max_bytes as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| {
                AppError::IoError(format!("Failed to read {}: {}", self.path.display(), e))
            })?;
        Ok(buffer)
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}
