use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::TemplateError;
use crate::template::model::Template;

/// Fonts probed, in order, when neither the template nor the options name one.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

/// Font file loaded into memory.
#[derive(Clone)]
pub struct LoadedFont {
    path: Arc<PathBuf>,
    bytes: Arc<Vec<u8>>,
    data: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("path", &self.path)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl LoadedFont {
    fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.clone()), 0);
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            bytes: Arc::new(bytes),
            data,
        })
    }

    /// Path the font was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn data(&self) -> &vello_cpu::peniko::FontData {
        &self.data
    }
}

/// Per-field font assignment for one template, resolved once per run.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    by_field: Vec<LoadedFont>,
}

impl FontBook {
    /// Resolve fonts for every field of `template`.
    ///
    /// Explicit template fonts must load and register. Fields without a font share the default
    /// font: `default_font` when it is usable, else the first usable system font when
    /// `system_fonts` is set. Every field must end up with a font; otherwise this returns
    /// [`TemplateError::FontUnavailable`] for the first field left without one.
    pub fn resolve(
        template: &Template,
        default_font: Option<&Path>,
        system_fonts: bool,
    ) -> Result<Self, TemplateError> {
        let candidates: &[&str] = if system_fonts {
            SYSTEM_FONT_CANDIDATES
        } else {
            &[]
        };
        Self::resolve_with(template, default_font, candidates)
    }

    fn resolve_with(
        template: &Template,
        default_font: Option<&Path>,
        candidates: &[&str],
    ) -> Result<Self, TemplateError> {
        let mut loaded: HashMap<PathBuf, LoadedFont> = HashMap::new();
        let mut default: Option<Option<LoadedFont>> = None;
        let mut probe = TextLayoutEngine::new();
        let mut by_field = Vec::with_capacity(template.fields.len());

        for field in &template.fields {
            let font = match &field.font {
                Some(path) => {
                    if let Some(f) = loaded.get(path) {
                        f.clone()
                    } else {
                        let unavailable = |reason: String| TemplateError::FontUnavailable {
                            field: field.name.clone(),
                            path: path.display().to_string(),
                            reason,
                        };
                        let f = LoadedFont::read(path).map_err(|e| unavailable(e.to_string()))?;
                        probe.family_for(&f).map_err(unavailable)?;
                        loaded.insert(path.clone(), f.clone());
                        f
                    }
                }
                None => default
                    .get_or_insert_with(|| load_default_font(default_font, candidates, &mut probe))
                    .clone()
                    .ok_or_else(|| TemplateError::FontUnavailable {
                        field: field.name.clone(),
                        path: default_font
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "<default>".to_owned()),
                        reason: "no usable default or system font found".to_owned(),
                    })?,
            };
            by_field.push(font);
        }

        Ok(Self { by_field })
    }

    /// Font for the field at `index` in template declaration order.
    pub fn font_for(&self, index: usize) -> Option<&LoadedFont> {
        self.by_field.get(index)
    }
}

fn load_default_font(
    configured: Option<&Path>,
    candidates: &[&str],
    probe: &mut TextLayoutEngine,
) -> Option<LoadedFont> {
    let configured = configured.map(Path::to_path_buf);
    let candidates = configured
        .iter()
        .cloned()
        .chain(candidates.iter().map(PathBuf::from));
    for path in candidates {
        let Ok(font) = LoadedFont::read(&path) else {
            if configured.as_ref() == Some(&path) {
                tracing::warn!(path = %path.display(), "configured default font is unreadable");
            }
            continue;
        };
        match probe.family_for(&font) {
            Ok(_) => {
                tracing::debug!(path = %path.display(), "using default font");
                return Some(font);
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "skipping unusable font");
            }
        }
    }
    None
}

/// Find the first default font candidate on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Stateful helper for building Parley text layouts from loaded fonts.
///
/// Each worker owns one; registered families are remembered per font file so repeated layouts
/// do not grow the font collection.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    families: HashMap<PathBuf, String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
        }
    }

    fn family_for(&mut self, font: &LoadedFont) -> Result<String, String> {
        if let Some(name) = self.families.get(font.path()) {
            return Ok(name.clone());
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| "no font families registered from font bytes".to_owned())?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| "registered font family has no name".to_owned())?
            .to_string();

        self.families
            .insert(font.path().to_path_buf(), family_name.clone());
        Ok(family_name)
    }

    /// Shape and lay out plain text.
    ///
    /// Lines wrap at `max_width_px` when given; glyph positions are relative to the top-left of
    /// the text box and every line starts at x = 0.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        font: &LoadedFont,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
    ) -> Result<parley::Layout<TextBrushRgba8>, String> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err("text size_px must be finite and > 0".to_owned());
        }

        let family_name = self.family_for(font)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(max_width_px);
        if let Some(w) = max_width_px {
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        }

        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
