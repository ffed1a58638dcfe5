use std::io;
use std::path::{Path, PathBuf};

use batterytag_core::{TagAccess, TagCapability, TagStatus};
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// NDEF capacity presets for common NXP tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagModel {
    Ntag213,
    #[default]
    Ntag215,
    Ntag216,
}

impl TagModel {
    pub fn capacity(self) -> usize {
        match self {
            TagModel::Ntag213 => 137,
            TagModel::Ntag215 => 492,
            TagModel::Ntag216 => 868,
        }
    }
}

#[derive(Debug, Error)]
pub enum TagFileError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("message of {len} bytes exceeds tag capacity of {capacity} bytes")]
    Overflow { len: usize, capacity: usize },
}

/// A simulated tag: a file holding the raw NDEF message.
///
/// A missing file means no tag is presented. An empty file is a blank tag.
pub struct FileTag {
    path: PathBuf,
    capacity: usize,
    access: TagAccess,
}

impl FileTag {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            access: TagAccess::ReadWrite,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.access = TagAccess::ReadOnly;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a blank tag if none is presented. Returns whether one was created.
    pub async fn present_blank(&self) -> Result<bool, TagFileError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        tokio::fs::write(&self.path, b"").await?;
        debug!(path = %self.path.display(), "created blank tag");
        Ok(true)
    }
}

impl TagCapability for FileTag {
    type Error = TagFileError;

    async fn read(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn status(&self) -> Result<Option<TagStatus>, Self::Error> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        Ok(Some(TagStatus {
            access: self.access,
            capacity: self.capacity,
        }))
    }

    async fn write(&self, message: &[u8]) -> Result<(), Self::Error> {
        if message.len() > self.capacity {
            return Err(TagFileError::Overflow {
                len: message.len(),
                capacity: self.capacity,
            });
        }
        // Write then rename so a failed write never leaves a half-written tag.
        let staging = self.path.with_extension("partial");
        tokio::fs::write(&staging, message).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), bytes = message.len(), "wrote tag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batterytag_core::ndef;
    use tempfile::TempDir;

    fn temp_tag(capacity: usize) -> (FileTag, TempDir) {
        let dir = TempDir::new().unwrap();
        let tag = FileTag::new(dir.path().join("tag.ndef"), capacity);
        (tag, dir)
    }

    #[tokio::test]
    async fn missing_file_is_no_tag() {
        let (tag, _dir) = temp_tag(137);
        assert!(tag.read().await.unwrap().is_none());
        assert!(tag.status().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_tag_reads_empty() {
        let (tag, _dir) = temp_tag(137);
        assert!(tag.present_blank().await.unwrap());
        assert!(!tag.present_blank().await.unwrap());
        assert_eq!(tag.read().await.unwrap(), Some(Vec::new()));

        let status = tag.status().await.unwrap().unwrap();
        assert_eq!(status.capacity, 137);
        assert_eq!(status.access, TagAccess::ReadWrite);
    }

    #[tokio::test]
    async fn write_then_read() {
        let (tag, _dir) = temp_tag(137);
        let message = ndef::text_message("{\"sn\":\"A\"}");
        tag.write(&message).await.unwrap();
        assert_eq!(tag.read().await.unwrap(), Some(message));
    }

    #[tokio::test]
    async fn write_over_capacity_fails() {
        let (tag, _dir) = temp_tag(8);
        let err = tag.write(&[0u8; 9]).await.unwrap_err();
        assert!(matches!(err, TagFileError::Overflow { len: 9, capacity: 8 }));
        assert!(tag.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_only_status() {
        let (tag, _dir) = temp_tag(137);
        let tag = tag.read_only();
        tag.present_blank().await.unwrap();
        assert_eq!(tag.status().await.unwrap().unwrap().access, TagAccess::ReadOnly);
    }

    #[test]
    fn presets() {
        assert_eq!(TagModel::Ntag213.capacity(), 137);
        assert_eq!(TagModel::Ntag215.capacity(), 492);
        assert_eq!(TagModel::Ntag216.capacity(), 868);
    }
}
