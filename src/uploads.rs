use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use bytes::BufMut;
use futures_util::TryStreamExt;
use image::ImageFormat;
use uuid::Uuid;
use warp::multipart::FormData;

use crate::{error::ApiError, RECIPE_UPLOAD_DIR};

pub const IMAGE_FIELD: &str = "image";

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

fn invalid_image() -> ApiError {
    ApiError::field(
        IMAGE_FIELD,
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
    )
}

/// Reads the first `image` part of a multipart body into memory.
pub async fn read_image_part(form: FormData) -> Result<UploadedFile, ApiError> {
    let mut form = Box::pin(form);
    let malformed = |e: warp::Error| ApiError::InvalidRequest(format!("Malformed upload: {e}"));

    while let Some(part) = form.try_next().await.map_err(malformed)? {
        if part.name() != IMAGE_FIELD {
            continue;
        }

        let filename = part.filename().map(str::to_string);
        let data = part
            .stream()
            .try_fold(Vec::new(), |mut data, chunk| async move {
                data.put(chunk);
                Ok(data)
            })
            .await
            .map_err(malformed)?;

        return Ok(UploadedFile { filename, data });
    }

    Err(ApiError::field(IMAGE_FIELD, "No file was submitted."))
}

/// Decodes `data` fully and returns its format if it is an image.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat, ApiError> {
    if data.is_empty() {
        return Err(ApiError::field(IMAGE_FIELD, "The submitted file is empty."));
    }

    let format = image::guess_format(data).map_err(|_| invalid_image())?;
    image::load_from_memory_with_format(data, format).map_err(|_| invalid_image())?;

    Ok(format)
}

/// `uploads/recipe/<name>.<ext>`, keeping the uploaded extension when it is sane.
pub fn recipe_image_path(filename: Option<&str>, format: ImageFormat, name: Uuid) -> String {
    let extension = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .or_else(|| format.extensions_str().first().map(|e| e.to_string()));

    match extension {
        Some(extension) => format!("{RECIPE_UPLOAD_DIR}/{name}.{extension}"),
        None => format!("{RECIPE_UPLOAD_DIR}/{name}"),
    }
}

/// Validates and writes an uploaded image, returning its path relative to `media_root`.
pub async fn store_recipe_image(media_root: &Path, file: &UploadedFile) -> Result<String, ApiError> {
    let format = validate_image(&file.data)?;
    let relative = recipe_image_path(file.filename.as_deref(), format, Uuid::new_v4());
    let path = media_root.join(&relative);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &file.data).await?;
    log::debug!("Stored {} bytes at {}", file.data.len(), path.display());

    Ok(relative)
}

pub fn media_path(media_root: &Path, relative: &str) -> PathBuf {
    media_root.join(relative)
}

/// Best effort removal of a stored file.
pub async fn remove_media(media_root: &Path, relative: &str) {
    match tokio::fs::remove_file(media_path(media_root, relative)).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {relative}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, Rgb};
    use rstest::rstest;

    use super::*;

    fn png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(10, 10);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn accepts_real_images() {
        assert_eq!(validate_image(&png()).unwrap(), ImageFormat::Png);
    }

    #[rstest]
    #[case(b"notanimage".to_vec())]
    #[case(Vec::new())]
    #[case(png()[..20].to_vec())]
    fn rejects_everything_else(#[case] data: Vec<u8>) {
        match validate_image(&data) {
            Err(ApiError::Validation(errors)) => assert!(errors.contains_key(IMAGE_FIELD)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[rstest]
    #[case(Some("example.jpg"), "uploads/recipe/test-uuid.jpg")]
    #[case(Some("PHOTO.JPEG"), "uploads/recipe/test-uuid.jpeg")]
    #[case(Some("noextension"), "uploads/recipe/test-uuid.png")]
    #[case(Some("weird.p/g"), "uploads/recipe/test-uuid.png")]
    #[case(None, "uploads/recipe/test-uuid.png")]
    fn image_path_uses_fresh_name(#[case] filename: Option<&str>, #[case] expected: &str) {
        let name = Uuid::new_v4();
        let path = recipe_image_path(filename, ImageFormat::Png, name);

        assert_eq!(path, expected.replace("test-uuid", &name.to_string()));
    }

    #[tokio::test]
    async fn stores_and_removes_files() {
        let media = tempfile::tempdir().unwrap();
        let file = UploadedFile {
            filename: Some(String::from("example.png")),
            data: png(),
        };

        let relative = store_recipe_image(media.path(), &file).await.unwrap();
        assert!(relative.starts_with("uploads/recipe/"));
        assert!(media_path(media.path(), &relative).exists());

        remove_media(media.path(), &relative).await;
        assert!(!media_path(media.path(), &relative).exists());
    }
}
