use std::path::PathBuf;

use crate::foundation::core::Rgba8;

/// Default maximum number of product images accepted in one batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Default maximum edge length, in pixels, of any decoded input image.
pub const DEFAULT_MAX_IMAGE_DIM: u32 = 8192;

/// Options controlling engine behavior.
///
/// Every knob has a sensible default; [`EngineOpts::from_env`] layers `FRAMEKIT_*` environment
/// overrides on top of the defaults.
#[derive(Clone, Debug)]
pub struct EngineOpts {
    /// Run batch items on a bounded `rayon` pool instead of strictly in order.
    ///
    /// Progress events then arrive in completion order.
    pub parallel: bool,
    /// Override the number of pool threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Maximum number of product paths accepted per request.
    pub max_batch_size: usize,
    /// Maximum width or height of a decoded input image.
    pub max_image_dim: u32,
    /// Font used for fields that do not name one.
    pub default_font: Option<PathBuf>,
    /// Fall back to well-known system font files when `default_font` is unset or unusable.
    pub system_fonts: bool,
    /// Color JPEG output is flattened onto, since JPEG carries no alpha.
    pub jpeg_background: Rgba8,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_image_dim: DEFAULT_MAX_IMAGE_DIM,
            default_font: None,
            system_fonts: true,
            jpeg_background: Rgba8::WHITE,
        }
    }
}

impl EngineOpts {
    /// Defaults with `FRAMEKIT_*` environment overrides applied.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn with_env_lookup(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = get("FRAMEKIT_PARALLEL").and_then(|v| parse_bool(&v)) {
            self.parallel = v;
        }
        if let Some(n) = get("FRAMEKIT_THREADS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.threads = Some(n);
        }
        if let Some(n) = get("FRAMEKIT_MAX_BATCH")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.max_batch_size = n;
        }
        if let Some(p) = get("FRAMEKIT_FONT").filter(|v| !v.trim().is_empty()) {
            self.default_font = Some(PathBuf::from(p));
        }
        if let Some(v) = get("FRAMEKIT_SYSTEM_FONTS").and_then(|v| parse_bool(&v)) {
            self.system_fonts = v;
        }
        self
    }

    /// Enable or disable pool-based execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the pool thread count.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Set the fallback font for fields without an explicit font.
    pub fn with_default_font(mut self, font: Option<PathBuf>) -> Self {
        self.default_font = font;
        self
    }

    /// Enable or disable the system font fallback.
    pub fn with_system_fonts(mut self, enabled: bool) -> Self {
        self.system_fonts = enabled;
        self
    }

    /// Set the maximum accepted batch size.
    pub fn with_max_batch_size(mut self, n: usize) -> Self {
        self.max_batch_size = n;
        self
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
