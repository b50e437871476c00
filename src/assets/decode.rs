use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::assets::svg_raster::{rasterize_svg_to_premul_rgba8, svg_intrinsic_size};
use crate::assets::{PreparedImage, premultiply_rgba8_in_place};
use crate::foundation::error::ComposeError;

/// Read and decode an image file.
///
/// Raster formats go through `image`; files that look like SVG documents are rasterized at their
/// intrinsic size.
pub fn load_image_file(path: &Path, max_dim: u32) -> Result<PreparedImage, ComposeError> {
    let bytes = std::fs::read(path).map_err(|source| ComposeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if looks_like_svg(&bytes) {
        return decode_svg(&bytes, max_dim);
    }
    decode_image(&bytes, max_dim)
}

/// Decode raster image bytes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8], max_dim: u32) -> Result<PreparedImage, ComposeError> {
    let format = image::guess_format(bytes)
        .map_err(|e| ComposeError::UnsupportedImageFormat(e.to_string()))?;

    // Header-only probe so oversized inputs are rejected before allocating pixels.
    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(classify_image_error)?;
    check_dims(width, height, max_dim)?;

    let dyn_img =
        image::load_from_memory_with_format(bytes, format).map_err(classify_image_error)?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse and rasterize an SVG document at its intrinsic size.
pub fn decode_svg(bytes: &[u8], max_dim: u32) -> Result<PreparedImage, ComposeError> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| ComposeError::CorruptImage(format!("svg: {e}")))?;
    let (width, height) = svg_intrinsic_size(&tree)?;
    check_dims(width, height, max_dim)?;
    let rgba8_premul = rasterize_svg_to_premul_rgba8(&tree, width, height)?;
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

const SVG_SNIFF_LEN: usize = 4096;

pub(crate) fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SVG_SNIFF_LEN)];
    // A multi-byte character may straddle the cut; sniff the valid prefix.
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        Err(e) => match std::str::from_utf8(&head[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") {
        return true;
    }
    let prologue = text.starts_with("<?xml")
        || text.starts_with("<!--")
        || text
            .get(..9)
            .is_some_and(|p| p.eq_ignore_ascii_case("<!DOCTYPE"));
    prologue && text.contains("<svg")
}

fn check_dims(width: u32, height: u32, max: u32) -> Result<(), ComposeError> {
    if width == 0 || height == 0 {
        return Err(ComposeError::CorruptImage(format!(
            "image has empty dimensions {width}x{height}"
        )));
    }
    if width > max || height > max {
        return Err(ComposeError::ImageTooLarge { width, height, max });
    }
    Ok(())
}

fn classify_image_error(e: image::ImageError) -> ComposeError {
    match e {
        image::ImageError::Unsupported(u) => ComposeError::UnsupportedImageFormat(u.to_string()),
        other => ComposeError::CorruptImage(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
