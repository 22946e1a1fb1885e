use std::path::{Path, PathBuf};

use chrono::Utc;
use cv_core::Payload;
use log::debug;
use uuid::Uuid;

use crate::error::AppError;

/// Writes generated payloads into one timestamped directory per run.
pub struct OutputStore {
    run_dir: PathBuf,
}

impl OutputStore {
    pub async fn create(root: &Path) -> Result<Self, AppError> {
        let run_dir = root.join(Utc::now().format("%Y%m%d-%H%M%S-%3f").to_string());
        tokio::fs::create_dir_all(&run_dir).await?;

        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Saves a payload as `<stem>.<ext>`. Without a stem a random one is picked.
    pub async fn save(&self, payload: &Payload, stem: Option<&str>) -> Result<PathBuf, AppError> {
        let (extension, bytes) = match payload {
            Payload::DataUri(_) => {
                let (mime_type, data) = payload.decode()?;
                (extension_for(&mime_type), data)
            }
            Payload::Text(text) => ("txt", text.clone().into_bytes()),
        };

        let stem = stem
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = self.run_dir.join(format!("{stem}.{extension}"));

        tokio::fs::write(&path, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(path)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Canvas Tote Bag"), "canvas-tote-bag");
        assert_eq!(slugify("  Mug (12oz) / white "), "mug-12oz-white");
        assert_eq!(slugify("✨"), "");
    }

    #[tokio::test]
    async fn test_save_decodes_data_uri() {
        let root = tempfile::tempdir().unwrap();
        let store = OutputStore::create(root.path()).await.unwrap();
        assert!(store.run_dir().starts_with(root.path()));

        let path = store
            .save(&Payload::data_uri("image/png", b"\x89PNG"), Some("Hero Shot"))
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "hero-shot.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_save_text_and_unnamed_payloads() {
        let root = tempfile::tempdir().unwrap();
        let store = OutputStore::create(root.path()).await.unwrap();

        let caption = store.save(&Payload::text("Sunny vibes"), Some("caption")).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&caption).await.unwrap(), "Sunny vibes");

        let video = store.save(&Payload::data_uri("video/mp4", b"mp4"), None).await.unwrap();
        assert_eq!(video.extension().unwrap(), "mp4");
        assert!(Uuid::parse_str(video.file_stem().unwrap().to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let store = OutputStore::create(root.path()).await.unwrap();

        let err = store.save(&Payload::DataUri("nope".into()), None).await.unwrap_err();
        assert!(matches!(err, AppError::Payload(_)));
    }
}
