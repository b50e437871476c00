use std::path::{Path, PathBuf};

use crate::foundation::core::{Rect, Rgba8};

pub use kurbo::Point;

/// Default text size in pixels when a field omits `size`.
pub const DEFAULT_FIELD_SIZE_PX: f32 = 24.0;

/// Horizontal placement of a field's text box relative to its anchor point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Box starts at the anchor.
    #[default]
    Left,
    /// Box is centered on the anchor.
    #[serde(alias = "middle")]
    Center,
    /// Box ends at the anchor.
    Right,
}

impl TextAlign {
    /// Fraction of the box width that lies left of the anchor.
    pub fn anchor_factor(self) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Stacking order of the product photo relative to the frame graphic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLayer {
    /// Frame is drawn over the product; transparent frame regions reveal the photo.
    #[default]
    UnderFrame,
    /// Product is drawn over the frame.
    OverFrame,
}

/// Region of the frame the product photo is fitted into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSlot {
    /// Slot rectangle in frame pixels.
    pub rect: Rect,
    /// Letterbox fill; falls back to the template background when unset.
    pub background: Option<Rgba8>,
}

/// One named text placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    /// Unique field name; the key looked up in the run's field values.
    pub name: String,
    /// Anchor point in frame pixels. `y` is the top of the text box.
    pub position: Point,
    /// Font file, already resolved against the template directory.
    pub font: Option<PathBuf>,
    /// Font size in pixels.
    pub size: f32,
    /// Fill color.
    pub color: Rgba8,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Wrap width in pixels.
    pub max_width: Option<f32>,
}

/// Parsed, validated template.
///
/// Immutable once parsed; share it behind an `Arc` for the duration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    /// Canvas fill drawn under everything else.
    pub background: Rgba8,
    /// Product slot. `None` fits the product to the whole frame.
    pub slot: Option<FrameSlot>,
    /// Product stacking order.
    pub product_layer: ProductLayer,
    /// Text fields in declaration order.
    pub fields: Vec<FieldSpec>,
    pub(crate) base_dir: PathBuf,
}

impl Template {
    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Directory relative font paths were resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Letterbox color used around a contained product.
    pub fn slot_background(&self) -> Rgba8 {
        self.slot
            .and_then(|s| s.background)
            .unwrap_or(self.background)
    }
}
