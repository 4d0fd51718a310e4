use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::Upload;
use crate::config::MediaConfig;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uploaded files on local disk, served back under the media URL prefix
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        let mut url_prefix = config.url_prefix.clone();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Self {
            root: config.root.clone(),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the upload under `<category>/` and return its path relative to the root
    pub async fn save(&self, category: &str, upload: &Upload) -> Result<String, MediaError> {
        self.save_bytes(category, &upload.file_name, &upload.bytes).await
    }

    pub async fn save_bytes(&self, category: &str, file_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let relative = format!("{}/{}_{}", category, Uuid::new_v4().simple(), sanitize_file_name(file_name));
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!("Stored upload at {}", target.display());
        Ok(relative)
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url_prefix, relative.trim_start_matches('/'))
    }

    /// Best effort: a missing file is not an error
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.contains("..") {
            return;
        }
        let target = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&target).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", target.display(), e);
            }
        }
    }
}

/// Keep the client's name recognizable but safe as a single path segment
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> MediaStore {
        MediaStore::new(&MediaConfig {
            root: root.to_path_buf(),
            url_prefix: "/media".to_string(),
        })
    }

    #[test]
    fn file_names_lose_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\ana\\hino 1.pdf"), "hino_1.pdf");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[tokio::test]
    async fn saved_files_are_reachable_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        let relative = media.save_bytes("resources", "estudo.pdf", b"%PDF").await.unwrap();
        assert!(relative.starts_with("resources/"));
        assert!(relative.ends_with("_estudo.pdf"));
        assert_eq!(media.url(&relative), format!("/media/{relative}"));
        assert_eq!(std::fs::read(dir.path().join(&relative)).unwrap(), b"%PDF");

        media.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());
        media.remove(&relative).await;
    }
}
