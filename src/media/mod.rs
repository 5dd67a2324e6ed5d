//! Image validation and storage for post uploads.
//!
//! Uploads are content-addressed: the SHA-256 of the bytes is the file name,
//! sharded two levels deep (`ab/cd/abcd….png`), so identical uploads share a file.

use async_trait::async_trait;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No file was submitted.")]
    Missing,

    #[error("The submitted file is empty.")]
    Empty,

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An upload that decoded cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ValidatedImage {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Sniff the format and fully decode the payload
pub fn validate_image(data: &[u8]) -> Result<ValidatedImage, MediaError> {
    if data.is_empty() {
        return Err(MediaError::Empty);
    }
    let format = image::guess_format(data).map_err(|_| MediaError::InvalidImage)?;
    let decoded = image::load_from_memory_with_format(data, format).map_err(|_| MediaError::InvalidImage)?;

    Ok(ValidatedImage {
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Storage collaborator for uploaded images.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist the bytes and return the public URL of the stored file
    async fn save_image(&self, data: &[u8], image: &ValidatedImage) -> Result<String, MediaError>;
}

/// Local filesystem implementation of `MediaStore`
pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// "ab/cd/abcd….ext"
    fn relative_path(hash: &str, extension: &str) -> String {
        format!("{}/{}/{}.{}", &hash[0..2], &hash[2..4], hash, extension)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save_image(&self, data: &[u8], image: &ValidatedImage) -> Result<String, MediaError> {
        let hash = format!("{:x}", Sha256::digest(data));
        let relative = Self::relative_path(&hash, image.extension());
        let target = self.root_path.join(&relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        if !fs::try_exists(&target).await? {
            fs::write(&target, data).await?;
            tracing::debug!(path = %target.display(), "stored upload");
        }

        Ok(format!("{}/{}", self.url_prefix, relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn accepts_png() {
        let image = validate_image(&png_bytes(3, 2)).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.extension(), "png");
    }

    #[test]
    fn rejects_text_and_empty_payloads() {
        assert!(matches!(validate_image(b"definitely not an image"), Err(MediaError::InvalidImage)));
        assert!(matches!(validate_image(b""), Err(MediaError::Empty)));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = png_bytes(16, 16);
        assert!(matches!(validate_image(&bytes[..bytes.len() / 2]), Err(MediaError::InvalidImage)));
    }

    #[tokio::test]
    async fn saves_sharded_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/");
        let bytes = png_bytes(4, 4);
        let image = validate_image(&bytes).unwrap();

        let first = store.save_image(&bytes, &image).await.unwrap();
        let second = store.save_image(&bytes, &image).await.unwrap();
        assert_eq!(first, second);

        let hash = format!("{:x}", Sha256::digest(&bytes));
        assert_eq!(first, format!("/media/{}/{}/{}.png", &hash[0..2], &hash[2..4], hash));
        assert!(dir.path().join(&hash[0..2]).join(&hash[2..4]).join(format!("{hash}.png")).exists());
    }
}
