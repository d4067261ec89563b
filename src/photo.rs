use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{CatalogError, Result};

/// Read an image and embed it as a `data:` URL so records never point at external files.
pub fn data_url(path: &Path) -> Result<String> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .ok_or_else(|| CatalogError::NotAnImage(path.to_path_buf()))?;

    let bytes = fs::read(path)?;
    Ok(format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes)))
}
