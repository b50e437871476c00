use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::assets::color::ColorDef;
use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::TemplateError;
use crate::template::model::{
    DEFAULT_FIELD_SIZE_PX, FieldSpec, FrameSlot, Point, ProductLayer, Template, TextAlign,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateDef {
    #[serde(default)]
    background: Option<ColorDef>,
    #[serde(default)]
    slot: Option<SlotDef>,
    #[serde(default)]
    product_layer: ProductLayer,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SlotDef {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    background: Option<ColorDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    position: PositionDef,
    #[serde(default)]
    font: Option<String>,
    #[serde(default)]
    size: Option<f32>,
    #[serde(default)]
    color: Option<ColorDef>,
    #[serde(default, alias = "alignment")]
    align: TextAlign,
    #[serde(default)]
    max_width: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PositionDef {
    Pair([f64; 2]),
    Obj { x: f64, y: f64 },
    Str(String),
}

impl PositionDef {
    fn to_point(&self, field: &str) -> Result<Point, TemplateError> {
        let (x, y) = match self {
            Self::Pair([x, y]) => (*x, *y),
            Self::Obj { x, y } => (*x, *y),
            Self::Str(s) => parse_position_str(s).ok_or_else(|| {
                TemplateError::malformed(format!(
                    "field '{field}': position \"{s}\" must look like \"x,y\""
                ))
            })?,
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(TemplateError::malformed(format!(
                "field '{field}': position must be finite"
            )));
        }
        Ok(Point::new(x, y))
    }
}

fn parse_position_str(s: &str) -> Option<(f64, f64)> {
    let (x, y) = s.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    Some((x, y))
}

/// Read and parse a template file.
///
/// Returns the template and its field names in declaration order. Relative font paths are
/// resolved against the template's directory. Slot bounds are not checked against any frame
/// here; that happens when compositing.
#[tracing::instrument(level = "debug")]
pub fn parse_template_file(path: &Path) -> Result<(Template, Vec<String>), TemplateError> {
    let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    parse_template_str(&text, &base_dir)
}

/// Parse template JSON, resolving relative font paths against `base_dir`.
pub fn parse_template_str(
    text: &str,
    base_dir: &Path,
) -> Result<(Template, Vec<String>), TemplateError> {
    let def: TemplateDef =
        serde_json::from_str(text).map_err(|e| TemplateError::malformed(e.to_string()))?;

    let slot = def.slot.map(validate_slot).transpose()?;
    if slot.is_none() && def.fields.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }

    let mut seen = HashSet::with_capacity(def.fields.len());
    let mut fields = Vec::with_capacity(def.fields.len());
    for f in def.fields {
        let name = f.name.trim().to_owned();
        if name.is_empty() {
            return Err(TemplateError::malformed("field name must be non-empty"));
        }
        if !seen.insert(name.clone()) {
            return Err(TemplateError::DuplicateField(name));
        }

        let size = f.size.unwrap_or(DEFAULT_FIELD_SIZE_PX);
        if !size.is_finite() || size <= 0.0 {
            return Err(TemplateError::malformed(format!(
                "field '{name}': size must be finite and > 0"
            )));
        }
        if let Some(w) = f.max_width
            && (!w.is_finite() || w <= 0.0)
        {
            return Err(TemplateError::malformed(format!(
                "field '{name}': max_width must be finite and > 0"
            )));
        }

        let position = f.position.to_point(&name)?;
        let font = f
            .font
            .filter(|p| !p.trim().is_empty())
            .map(|p| resolve_path(base_dir, &p));

        fields.push(FieldSpec {
            name,
            position,
            font,
            size,
            color: f.color.map(|c| c.0).unwrap_or(Rgba8::WHITE),
            align: f.align,
            max_width: f.max_width,
        });
    }

    let template = Template {
        background: def.background.map(|c| c.0).unwrap_or(Rgba8::TRANSPARENT),
        slot,
        product_layer: def.product_layer,
        fields,
        base_dir: base_dir.to_path_buf(),
    };
    let names = template.field_names();
    Ok((template, names))
}

fn validate_slot(s: SlotDef) -> Result<FrameSlot, TemplateError> {
    let all_finite = [s.x, s.y, s.width, s.height].iter().all(|v| v.is_finite());
    if !all_finite {
        return Err(TemplateError::malformed("slot values must be finite"));
    }
    if s.width <= 0.0 || s.height <= 0.0 {
        return Err(TemplateError::malformed("slot width/height must be > 0"));
    }
    if s.x < 0.0 || s.y < 0.0 {
        return Err(TemplateError::malformed("slot x/y must be >= 0"));
    }
    Ok(FrameSlot {
        rect: Rect::new(s.x, s.y, s.x + s.width, s.y + s.height),
        background: s.background.map(|c| c.0),
    })
}

fn resolve_path(base_dir: &Path, p: &str) -> PathBuf {
    let p = Path::new(p.trim());
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/parser.rs"]
mod tests;
