//! Framekit applies one reusable frame template to many product photos.
//!
//! A template places the product photo into a slot of a frame graphic and draws named text
//! fields on top. The public API is engine-oriented:
//!
//! - Query a template's fields with [`Engine::template_fields`]
//! - Render one image in memory with [`Engine::preview`]
//! - Frame a whole batch with [`Engine::run_batch`] or [`Engine::start_batch`], receiving
//!   [`BatchEvent`]s and a [`BatchSummary`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod encode;
mod foundation;
mod render;
mod session;
mod template;

pub use crate::foundation::config::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_IMAGE_DIM, EngineOpts};
pub use crate::foundation::core::{OutputFormat, PixelRect, Rect, Rgba8};
pub use crate::foundation::error::{
    ComposeError, EncodeError, FramekitError, FramekitResult, TemplateError,
};

pub use crate::assets::PreparedImage;
pub use crate::assets::color::parse_color;
pub use crate::assets::decode::{decode_image, decode_svg, load_image_file};
pub use crate::assets::fonts::{FontBook, LoadedFont, find_system_font};
pub use crate::encode::{QUALITY_RANGE, encode};
pub use crate::render::compositor::Compositor;
pub use crate::render::{CompositeImage, FieldValues};
pub use crate::session::batch::{BatchSummary, CancelFlag, ItemFailure};
pub use crate::session::engine::{BatchHandle, Engine};
pub use crate::session::events::{
    BatchEvent, BatchRequest, CancelledNotice, ChannelSink, CompletionNotice, ErrorNotice,
    EventSink, InMemoryEvents, MAX_EVENT_MESSAGE_CHARS, PreviewRequest, ProgressEvent,
    ProgressStatus,
};
pub use crate::template::model::{
    DEFAULT_FIELD_SIZE_PX, FieldSpec, FrameSlot, Point, ProductLayer, Template, TextAlign,
};
pub use crate::template::parser::{parse_template_file, parse_template_str};
pub use crate::template::store::TemplateStore;
