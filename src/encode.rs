//! Serialization of composited images to PNG, JPEG and WebP.

use std::io::Cursor;

use image::{ExtendedColorType, ImageEncoder};

use crate::foundation::core::{OutputFormat, Rgba8};
use crate::foundation::error::EncodeError;
use crate::render::CompositeImage;

/// Accepted quality range for lossy formats.
pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=100;

/// Encode `image` as `format`.
///
/// `quality` applies to JPEG and WebP and must lie in [`QUALITY_RANGE`]; PNG is lossless and
/// ignores it. JPEG has no alpha channel, so the image is flattened over `jpeg_background` first.
/// WebP keeps alpha.
pub fn encode(
    image: &CompositeImage,
    format: OutputFormat,
    quality: u8,
    jpeg_background: Rgba8,
) -> Result<Vec<u8>, EncodeError> {
    let expected = image.width as usize * image.height as usize * 4;
    if image.width == 0 || image.height == 0 || image.rgba.len() != expected {
        return Err(EncodeError::EncodeFailure(format!(
            "image buffer does not match {}x{}",
            image.width, image.height
        )));
    }

    if format.takes_quality() && !QUALITY_RANGE.contains(&quality) {
        return Err(EncodeError::EncodeFailure(format!(
            "{format} quality {quality} is outside 1..=100"
        )));
    }

    let mut out = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Png => image::codecs::png::PngEncoder::new(&mut out).write_image(
            &image.rgba,
            image.width,
            image.height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpg => {
            let rgb = flatten_to_rgb8(&image.rgba, jpeg_background);
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).write_image(
                &rgb,
                image.width,
                image.height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::WebP => {
            let encoded = webp::Encoder::from_rgba(&image.rgba, image.width, image.height)
                .encode_simple(false, f32::from(quality))
                .map_err(|e| EncodeError::EncodeFailure(format!("webp encoder failed: {e:?}")))?;
            out.get_mut().extend_from_slice(&encoded);
            Ok(())
        }
    };
    result.map_err(|e| EncodeError::EncodeFailure(e.to_string()))?;

    let bytes = out.into_inner();
    tracing::debug!(%format, len = bytes.len(), "encoded image");
    Ok(bytes)
}

/// Composite straight RGBA8 over an opaque background color, dropping alpha.
fn flatten_to_rgb8(src: &[u8], bg: Rgba8) -> Vec<u8> {
    let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
    let mut dst = Vec::with_capacity(src.len() / 4 * 3);
    for s in src.chunks_exact(4) {
        let a = u16::from(s[3]);
        if a == 255 {
            dst.extend_from_slice(&s[..3]);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = mul_div255(u16::from(s[c]), a) + mul_div255(bg[c], inv);
            dst.push(v.min(255) as u8);
        }
    }
    dst
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

#[cfg(test)]
#[path = "../tests/unit/encode/encode.rs"]
mod tests;
