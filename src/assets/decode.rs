use std::{fs, io, path::Path};

use image::RgbaImage;

use crate::foundation::error::{PortraitError, PortraitResult};

/// Decode encoded image bytes into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> PortraitResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| PortraitError::decode(format!("decode image from memory: {e}")))?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file. A missing file is `NotFound`, other read errors `IoFailure`.
pub fn load_image(path: &Path) -> PortraitResult<RgbaImage> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            PortraitError::not_found(format!("image '{}'", path.display()))
        }
        _ => PortraitError::io(format!("read image '{}'", path.display()), e),
    })?;
    decode_image(&bytes).map_err(|e| match e {
        PortraitError::Decode(msg) => {
            PortraitError::decode(format!("'{}': {msg}", path.display()))
        }
        other => other,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
