/// Crate-wide result alias.
pub type FramekitResult<T> = Result<T, FramekitError>;

/// Template loading and validation failures.
///
/// These always surface before a batch run starts.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template '{path}': {source}")]
    Unreadable {
        /// Path as given by the caller.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The template is not valid JSON or violates the schema.
    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    /// Two field placeholders share a name.
    #[error("duplicate template field '{0}'")]
    DuplicateField(String),

    /// The template declares neither a frame slot nor any field.
    #[error("template declares no frame slot and no fields")]
    EmptyTemplate,

    /// A font referenced by the template could not be loaded.
    #[error("font '{path}' for field '{field}' is unavailable: {reason}")]
    FontUnavailable {
        /// Field that references the font.
        field: String,
        /// Resolved font path.
        path: String,
        /// Human-readable failure.
        reason: String,
    },
}

impl TemplateError {
    /// Build a [`TemplateError::MalformedTemplate`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedTemplate(msg.into())
    }
}

/// Failures while decoding inputs or compositing one image.
#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    /// A field declared by the template has no (non-empty) value.
    #[error("missing value for template field '{0}'")]
    MissingField(String),

    /// The input bytes are not in an image format the decoder understands.
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// The input claims a known format but could not be decoded.
    #[error("corrupt image: {0}")]
    CorruptImage(String),

    /// The decoded image exceeds the configured maximum dimensions.
    #[error("image {width}x{height} exceeds maximum {max}x{max}")]
    ImageTooLarge {
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Configured maximum edge length.
        max: u32,
    },

    /// The template's frame slot does not fit inside the frame image.
    #[error("frame slot {slot} lies outside the {width}x{height} frame")]
    SlotOutOfBounds {
        /// Slot rectangle formatted as `x,y wxh`.
        slot: String,
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },

    /// The canvas cannot be represented by the rasterizer.
    #[error("canvas {width}x{height} is too large to rasterize")]
    CanvasTooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Field text could not be shaped.
    #[error("text layout failed for field '{field}': {reason}")]
    TextLayout {
        /// Field being laid out.
        field: String,
        /// Human-readable failure.
        reason: String,
    },

    /// The image file could not be read from disk.
    #[error("failed to read image '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failures while serializing a composited image.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The requested output format is not one of png, jpg or webp.
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    /// The encoder rejected the image.
    #[error("encode failure: {0}")]
    EncodeFailure(String),
}

/// Top-level error returned by the engine API.
#[derive(thiserror::Error, Debug)]
pub enum FramekitError {
    /// Bad request shape or unusable paths, detected before a run starts.
    #[error("config error: {0}")]
    Config(String),

    /// A template field has no value in the request.
    #[error("missing value for template field '{0}'")]
    MissingField(String),

    /// Template failure.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The frame image could not be loaded; raised before a run starts.
    #[error("frame image is unusable: {0}")]
    Frame(#[source] ComposeError),

    /// Decode or compositing failure.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Output encoding failure.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Another batch run is already active on this engine.
    #[error("another batch is already processing")]
    Busy,

    /// Anything else, with context attached by `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramekitError {
    /// Build a [`FramekitError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Return `true` when this error was raised before any work started.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingField(_)
                | Self::Template(_)
                | Self::Frame(_)
                | Self::Busy
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
