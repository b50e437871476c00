use crate::foundation::config::EngineOpts;
use crate::foundation::error::{FramekitError, FramekitResult};
use crate::render::compositor::Compositor;
use crate::session::batch::{prepare_inputs, render_item};
use crate::session::events::PreviewRequest;
use crate::template::store::TemplateStore;

/// Render the request's first product image exactly as a batch item would, without writing it.
#[tracing::instrument(level = "debug", skip_all, fields(template = %req.template_path.display()))]
pub(crate) fn render_preview(
    req: &PreviewRequest,
    opts: &EngineOpts,
    templates: &TemplateStore,
) -> FramekitResult<Vec<u8>> {
    let first = req
        .product_paths
        .first()
        .ok_or_else(|| FramekitError::config("no product images were given"))?;
    let inputs = prepare_inputs(req, opts, templates)?;
    render_item(&mut Compositor::new(), &inputs, first)
}
