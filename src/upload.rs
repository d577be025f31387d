use std::path::Path;

use axum::body::Bytes;
use axum::extract::Multipart;
use rand::Rng;

use crate::error::ApiError;
use crate::media::MediaManager;

const IMAGE_FIELD: &str = "image";
const FOLDER_FIELD: &str = "folder";

/// The parts of an upload form we care about.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<UploadedImage>,
    pub folder: Option<String>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Drain the multipart body. Field order is not significant, so the whole
/// form is read before anything is written.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                // An empty part without a file name is an unfilled file input.
                let named = file_name.as_deref().is_some_and(|n| !n.is_empty());
                if named || !bytes.is_empty() {
                    form.image = Some(UploadedImage { file_name, bytes });
                }
            }
            Some(FOLDER_FIELD) => {
                let folder = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                if !folder.trim().is_empty() {
                    form.folder = Some(folder);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `img-<millis>-<random><ext>`; only the extension of the client's file name is kept.
pub fn generate_file_name(original: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..=1_000_000_000);
    let ext = original.map(extension_of).unwrap_or_default();
    format!("img-{}-{}{}", millis, suffix, ext)
}

/// Extension including the leading dot, or empty.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Store an uploaded image and return its public URL.
pub async fn store_image(
    media: &MediaManager,
    folder: Option<&str>,
    image: &UploadedImage,
) -> Result<String, ApiError> {
    let file_name = generate_file_name(image.file_name.as_deref());
    let url = media.write_file(folder, &file_name, &image.bytes).await?;
    Ok(url)
}
