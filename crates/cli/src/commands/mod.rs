//! Command implementations.

pub mod catalog;
pub mod orders;
pub mod settings;
pub mod sponsors;
pub mod users;

use std::path::Path;

use foodtruck_storefront::AppError;
use foodtruck_storefront::services::admin::ImageUpload;

/// Read an image file for upload.
async fn read_image(path: &Path) -> Result<ImageUpload, AppError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::BadRequest(format!("cannot read {}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(ImageUpload {
        content_type: content_type(&file_name).to_string(),
        file_name,
        bytes,
    })
}

/// MIME type guessed from the file extension.
fn content_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("burger.JPG"), "image/jpeg");
        assert_eq!(content_type("logo.svg"), "image/svg+xml");
        assert_eq!(content_type("notes"), "application/octet-stream");
    }
}
