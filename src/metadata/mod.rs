use crate::parser::Fields;
use crate::server::MetaError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fs::Metadata;
use std::path::Path;

/// Base filesystem attributes reported for every file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes
    pub size: u64,
    /// Birth time, or modification time where the platform has none
    pub created: DateTime<Utc>,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Lowercase extension with leading dot (".png"), empty if none
    pub extension: String,
}

impl FileMetadata {
    /// Build from a `stat` result
    pub fn from_fs(path: &Path, stats: &Metadata) -> Result<Self, MetaError> {
        let modified = stats.modified().map_err(|source| MetaError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let created = stats.created().unwrap_or(modified);

        Ok(Self {
            size: stats.len(),
            created: DateTime::<Utc>::from(created),
            modified: DateTime::<Utc>::from(modified),
            extension: extension_of(path),
        })
    }

    /// Base fields in response order: size, created, modified, type
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("size".to_string(), Value::from(self.size));
        fields.insert("created".to_string(), Value::from(format_timestamp(&self.created)));
        fields.insert("modified".to_string(), Value::from(format_timestamp(&self.modified)));
        fields.insert("type".to_string(), Value::from(self.extension));
        fields
    }
}

/// Lowercase extension of the final path component, with its leading dot
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stat `path` and enforce the size ceiling
///
/// Oversized files yield [`MetaError::FileTooLarge`] so that no parser ever
/// sees them.
pub async fn collect(path: &Path, max_file_size: u64) -> Result<FileMetadata, MetaError> {
    let stats = tokio::fs::metadata(path)
        .await
        .map_err(|source| MetaError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

    if stats.len() > max_file_size {
        return Err(MetaError::FileTooLarge {
            size: stats.len(),
            limit: max_file_size,
        });
    }

    FileMetadata::from_fs(path, &stats)
}
