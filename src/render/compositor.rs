use std::sync::Arc;

use crate::assets::fonts::{FontBook, LoadedFont, TextBrushRgba8, TextLayoutEngine};
use crate::assets::{PreparedImage, unpremultiply_rgba8_in_place};
use crate::foundation::core::{PixelRect, Rect, Rgba8};
use crate::foundation::error::ComposeError;
use crate::render::{CompositeImage, FieldValues};
use crate::template::model::{FieldSpec, ProductLayer, Template};

/// Per-worker compositing state.
///
/// A compositor owns its scratch contexts, so workers never share mutable state. Results depend
/// only on the inputs passed to [`Compositor::compose`].
pub struct Compositor {
    text: TextLayoutEngine,
    ctx: Option<(u16, u16, vello_cpu::RenderContext)>,
    frame_paint: Option<(Arc<Vec<u8>>, vello_cpu::Image)>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("canvas", &self.ctx.as_ref().map(|(w, h, _)| (*w, *h)))
            .finish_non_exhaustive()
    }
}

impl Compositor {
    /// Create a compositor with empty scratch state.
    pub fn new() -> Self {
        Self {
            text: TextLayoutEngine::new(),
            ctx: None,
            frame_paint: None,
        }
    }

    /// Composite `product` into `frame` and draw the template's field text.
    ///
    /// The output canvas has the frame's size. The product is fitted into the slot with
    /// contain semantics and centered; uncovered slot area is filled with the slot background.
    pub fn compose(
        &mut self,
        frame: &PreparedImage,
        product: &PreparedImage,
        template: &Template,
        values: &FieldValues,
        fonts: &FontBook,
    ) -> Result<CompositeImage, ComposeError> {
        let texts = field_texts(template, values)?;

        let (w, h) = canvas_size(frame)?;
        let slot = slot_rect(template, frame)?;
        let placement = fit_contain(product.width, product.height, slot);
        let product_paint = product_paint(product, placement)?;
        let frame_paint = self.frame_paint_for(frame)?;

        if self
            .ctx
            .as_ref()
            .is_some_and(|(cw, ch, _)| (*cw, *ch) != (w, h))
        {
            self.ctx = None;
        }
        let ctx = &mut self
            .ctx
            .get_or_insert_with(|| (w, h, vello_cpu::RenderContext::new(w, h)))
            .2;
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        fill(ctx, template.background, canvas_rect(frame));
        if template.slot.is_some() {
            fill(ctx, template.slot_background(), slot);
        }

        let product_layer = |ctx: &mut vello_cpu::RenderContext| {
            if let Some((paint, at)) = &product_paint {
                draw_image(ctx, paint.clone(), *at);
            }
        };
        if template.product_layer == ProductLayer::UnderFrame {
            product_layer(ctx);
        }
        draw_image(
            ctx,
            frame_paint,
            PixelRect {
                x: 0,
                y: 0,
                width: frame.width,
                height: frame.height,
            },
        );
        if template.product_layer == ProductLayer::OverFrame {
            product_layer(ctx);
        }

        for (i, (field, text)) in template.fields.iter().zip(texts).enumerate() {
            let font = fonts.font_for(i).ok_or_else(|| ComposeError::TextLayout {
                field: field.name.clone(),
                reason: "no font resolved for field".to_owned(),
            })?;
            draw_field_text(ctx, &mut self.text, field, text, font)?;
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        let mut rgba = pixmap.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut rgba);
        Ok(CompositeImage {
            width: frame.width,
            height: frame.height,
            rgba,
        })
    }

    fn frame_paint_for(&mut self, frame: &PreparedImage) -> Result<vello_cpu::Image, ComposeError> {
        if let Some((bytes, paint)) = &self.frame_paint
            && Arc::ptr_eq(bytes, &frame.rgba8_premul)
        {
            return Ok(paint.clone());
        }
        let paint = image_paint(pixmap_from_premul_bytes(
            &frame.rgba8_premul,
            frame.width,
            frame.height,
        )?);
        self.frame_paint = Some((frame.rgba8_premul.clone(), paint.clone()));
        Ok(paint)
    }
}

fn field_texts<'a>(template: &Template, values: &'a FieldValues) -> Result<Vec<&'a str>, ComposeError> {
    template
        .fields
        .iter()
        .map(|f| {
            values
                .get(&f.name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ComposeError::MissingField(f.name.clone()))
        })
        .collect()
}

fn canvas_size(frame: &PreparedImage) -> Result<(u16, u16), ComposeError> {
    let too_large = || ComposeError::CanvasTooLarge {
        width: frame.width,
        height: frame.height,
    };
    let w: u16 = frame.width.try_into().map_err(|_| too_large())?;
    let h: u16 = frame.height.try_into().map_err(|_| too_large())?;
    if w == 0 || h == 0 {
        return Err(ComposeError::CorruptImage("frame has zero size".to_owned()));
    }
    Ok((w, h))
}

fn canvas_rect(frame: &PreparedImage) -> Rect {
    Rect::new(0.0, 0.0, f64::from(frame.width), f64::from(frame.height))
}

fn slot_rect(template: &Template, frame: &PreparedImage) -> Result<Rect, ComposeError> {
    let Some(slot) = template.slot else {
        return Ok(canvas_rect(frame));
    };
    let r = slot.rect;
    if r.x0 < 0.0 || r.y0 < 0.0 || r.x1 > f64::from(frame.width) || r.y1 > f64::from(frame.height)
    {
        return Err(ComposeError::SlotOutOfBounds {
            slot: format!("{},{} {}x{}", r.x0, r.y0, r.width(), r.height()),
            width: frame.width,
            height: frame.height,
        });
    }
    Ok(r)
}

/// Largest integer rectangle with the source aspect ratio that fits in `slot`, centered.
pub(crate) fn fit_contain(src_w: u32, src_h: u32, slot: Rect) -> PixelRect {
    if src_w == 0 || src_h == 0 || slot.width() <= 0.0 || slot.height() <= 0.0 {
        return PixelRect {
            x: slot.x0.max(0.0).round() as u32,
            y: slot.y0.max(0.0).round() as u32,
            width: 0,
            height: 0,
        };
    }
    let scale = (slot.width() / f64::from(src_w)).min(slot.height() / f64::from(src_h));
    let width = (f64::from(src_w) * scale)
        .round()
        .clamp(1.0, slot.width().floor().max(1.0)) as u32;
    let height = (f64::from(src_h) * scale)
        .round()
        .clamp(1.0, slot.height().floor().max(1.0)) as u32;
    let x = slot.x0 + (slot.width() - f64::from(width)) / 2.0;
    let y = slot.y0 + (slot.height() - f64::from(height)) / 2.0;
    PixelRect {
        x: x.max(0.0).floor() as u32,
        y: y.max(0.0).floor() as u32,
        width,
        height,
    }
}

fn product_paint(
    product: &PreparedImage,
    at: PixelRect,
) -> Result<Option<(vello_cpu::Image, PixelRect)>, ComposeError> {
    if at.is_empty() {
        return Ok(None);
    }
    let pixmap = if (at.width, at.height) == (product.width, product.height) {
        pixmap_from_premul_bytes(&product.rgba8_premul, product.width, product.height)?
    } else {
        let src = image::RgbaImage::from_raw(
            product.width,
            product.height,
            product.rgba8_premul.to_vec(),
        )
        .ok_or_else(|| ComposeError::CorruptImage("product byte length mismatch".to_owned()))?;
        let resized = image::imageops::resize(
            &src,
            at.width,
            at.height,
            image::imageops::FilterType::Lanczos3,
        );
        let mut bytes = resized.into_raw();
        clamp_premultiplied(&mut bytes);
        pixmap_from_premul_bytes(&bytes, at.width, at.height)?
    };
    Ok(Some((image_paint(pixmap), at)))
}

// Lanczos ringing can push a color channel above its alpha.
fn clamp_premultiplied(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        px[0] = px[0].min(a);
        px[1] = px[1].min(a);
        px[2] = px[2].min(a);
    }
}

fn fill(ctx: &mut vello_cpu::RenderContext, color: Rgba8, rect: Rect) {
    if color.is_transparent() {
        return;
    }
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(rect.x0, rect.y0, rect.x1, rect.y1));
}

fn draw_image(ctx: &mut vello_cpu::RenderContext, paint: vello_cpu::Image, at: PixelRect) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((
        f64::from(at.x),
        f64::from(at.y),
    )));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(at.width),
        f64::from(at.height),
    ));
}

fn draw_field_text(
    ctx: &mut vello_cpu::RenderContext,
    engine: &mut TextLayoutEngine,
    field: &FieldSpec,
    text: &str,
    font: &LoadedFont,
) -> Result<(), ComposeError> {
    let brush = TextBrushRgba8 {
        r: field.color.r,
        g: field.color.g,
        b: field.color.b,
        a: field.color.a,
    };
    let layout = engine
        .layout_plain(text, font, field.size, brush, field.max_width)
        .map_err(|reason| ComposeError::TextLayout {
            field: field.name.clone(),
            reason,
        })?;

    let factor = field.align.anchor_factor();
    let box_width = field.max_width.unwrap_or_else(|| {
        layout
            .lines()
            .map(|line| line.metrics().advance)
            .fold(0.0, f32::max)
    });
    let origin_x = field.position.x - f64::from(box_width * factor);

    for line in layout.lines() {
        let dx = (box_width - line.metrics().advance).max(0.0) * factor;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            origin_x + f64::from(dx),
            field.position.y,
        )));
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font.data())
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    Ok(())
}

fn image_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

fn pixmap_from_premul_bytes(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> Result<vello_cpu::Pixmap, ComposeError> {
    let too_large = || ComposeError::CanvasTooLarge { width, height };
    let w: u16 = width.try_into().map_err(|_| too_large())?;
    let h: u16 = height.try_into().map_err(|_| too_large())?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(ComposeError::CorruptImage(
            "prepared image byte length mismatch".to_owned(),
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
