//! Filesystem-backed persistence for inline generated images.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pdispatch::{ArtifactError, ArtifactFuture, FileMetadata, ImageStore, SaveImageRequest};

use crate::storage::{safe_segment, write_atomic};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    /// Accepts `data:<mime>;base64,<payload>` only.
    pub fn parse(url: &str) -> Result<Self, ArtifactError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ArtifactError::image_persistence("image url is not a data url"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ArtifactError::image_persistence("data url has no payload"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| {
                ArtifactError::image_persistence(format!("unsupported data url header '{header}'"))
            })?;
        let bytes = STANDARD.decode(payload.trim()).map_err(|error| {
            ArtifactError::image_persistence(format!("invalid base64 image payload: {error}"))
        })?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/svg+xml" => "svg",
            other => other.trim_start_matches("image/"),
        }
    }

    /// Width and height read from a PNG header.
    pub fn png_dimensions(&self) -> Option<(u32, u32)> {
        if !self.bytes.starts_with(PNG_SIGNATURE) || self.bytes.len() < 24 {
            return None;
        }
        let width = u32::from_be_bytes(self.bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(self.bytes[20..24].try_into().ok()?);
        Some((width, height))
    }
}

/// Writes images to `<root>/images/<user>/<file_id>-<filename>.<ext>`.
#[derive(Debug, Clone)]
pub struct FilesystemImageStore {
    root: PathBuf,
}

impl FilesystemImageStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageStore for FilesystemImageStore {
    fn save_base64_image<'a>(
        &'a self,
        url: String,
        request: SaveImageRequest,
    ) -> ArtifactFuture<'a, Result<FileMetadata, ArtifactError>> {
        Box::pin(async move {
            let image = InlineImage::parse(&url)?;
            let file_id = request
                .file_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let filename = format!("{}.{}", request.filename, image.extension());
            let relative = PathBuf::from("images")
                .join(safe_segment(request.user_id.as_str()))
                .join(safe_segment(&format!("{file_id}-{filename}")));

            write_atomic(&self.root.join(&relative), &image.bytes)
                .await
                .map_err(|error| ArtifactError::image_persistence(error.to_string()))?;

            tracing::debug!(
                phase = "files",
                event = "image_saved",
                file_id = %file_id,
                bytes = image.bytes.len(),
                endpoint = request.endpoint.as_deref().unwrap_or_default()
            );

            let mut file = FileMetadata::new(
                file_id,
                filename,
                format!("/{}", relative.to_string_lossy()),
                image.mime_type.clone(),
                request.context,
            )
            .with_bytes(image.bytes.len() as u64);
            if let Some((width, height)) = image.png_dimensions() {
                file = file.with_dimensions(width, height);
            }
            Ok(file)
        })
    }
}

#[cfg(test)]
mod tests {
    use pcommon::UserId;
    use pdispatch::{ArtifactErrorKind, FileContext};

    use super::*;

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("pfiles-{prefix}-{unique}"))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13_u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    fn request(file_id: Option<&str>) -> SaveImageRequest {
        SaveImageRequest {
            user_id: UserId::from("user-1"),
            file_id: file_id.map(ToString::to_string),
            filename: "dalle_call-1_img_abc".to_string(),
            endpoint: Some("openai".to_string()),
            context: FileContext::ImageGeneration,
        }
    }

    #[test]
    fn parses_data_urls_and_rejects_others() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(4, 3)));
        let image = InlineImage::parse(&url).expect("png data url should parse");

        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.extension(), "png");
        assert_eq!(image.png_dimensions(), Some((4, 3)));

        for bad in [
            "https://cdn.test/a.png",
            "data:image/png;base64",
            "data:text/plain;base64,aGk=",
            "data:image/png,rawbytes",
            "data:image/png;base64,***",
        ] {
            let error = InlineImage::parse(bad).expect_err("should be rejected");
            assert_eq!(error.kind, ArtifactErrorKind::ImagePersistence);
        }
    }

    #[tokio::test]
    async fn saves_under_user_directory_with_assigned_id() {
        let root = temp_dir("images");
        let store = FilesystemImageStore::new(&root);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(8, 2)));

        let file = store
            .save_base64_image(url, request(Some("file-42")))
            .await
            .expect("image should save");

        assert_eq!(file.file_id, "file-42");
        assert_eq!(file.filename, "dalle_call-1_img_abc.png");
        assert_eq!(file.filepath, "/images/user-1/file-42-dalle_call-1_img_abc.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.context, FileContext::ImageGeneration);
        assert_eq!((file.width, file.height), (Some(8), Some(2)));

        let written = std::fs::read(root.join("images/user-1/file-42-dalle_call-1_img_abc.png"))
            .expect("file should exist");
        assert_eq!(written.len() as u64, file.bytes);
    }

    #[tokio::test]
    async fn generates_an_id_when_none_is_assigned() {
        let root = temp_dir("images-generated");
        let store = FilesystemImageStore::new(&root);
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpegish"));

        let file = store
            .save_base64_image(url, request(None))
            .await
            .expect("image should save");

        assert!(!file.file_id.is_empty());
        assert!(file.filename.ends_with(".jpg"));
        assert_eq!(file.width, None);
    }
}
