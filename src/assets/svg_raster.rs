use crate::foundation::error::ComposeError;

/// Largest raster edge an SVG frame may request.
const MAX_SVG_DIM: u32 = 16_384;

/// Pixel size an SVG document rasterizes to at 1:1 scale.
pub fn svg_intrinsic_size(tree: &usvg::Tree) -> Result<(u32, u32), ComposeError> {
    fn to_px(v: f32) -> Result<u32, ComposeError> {
        if !v.is_finite() || v <= 0.0 {
            return Err(ComposeError::CorruptImage(
                "svg has invalid width/height".to_owned(),
            ));
        }
        Ok((v.ceil() as u32).max(1))
    }

    let size = tree.size();
    let w = to_px(size.width())?;
    let h = to_px(size.height())?;
    if w > MAX_SVG_DIM || h > MAX_SVG_DIM {
        return Err(ComposeError::ImageTooLarge {
            width: w,
            height: h,
            max: MAX_SVG_DIM,
        });
    }
    Ok((w, h))
}

/// Rasterize `tree` into a `width` x `height` premultiplied RGBA8 buffer.
pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ComposeError> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or(
        ComposeError::CanvasTooLarge { width, height },
    )?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}
