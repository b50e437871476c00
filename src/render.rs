//! Compositing of one product photo into a frame.

use std::collections::BTreeMap;

pub(crate) mod compositor;

/// Text value per template field name, identical for every item of a run.
pub type FieldValues = BTreeMap<String, String>;

/// Result of one compositing operation: straight-alpha RGBA8, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeImage {
    /// Width in pixels; always the frame width.
    pub width: u32,
    /// Height in pixels; always the frame height.
    pub height: u32,
    /// Straight RGBA8 pixels.
    pub rgba: Vec<u8>,
}

impl CompositeImage {
    /// Straight RGBA8 value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
