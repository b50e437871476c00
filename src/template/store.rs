use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::foundation::error::TemplateError;
use crate::template::model::Template;
use crate::template::parser::parse_template_file;

#[derive(Clone)]
struct CachedTemplate {
    modified: Option<SystemTime>,
    template: Arc<Template>,
}

/// Thread-safe cache of parsed templates.
///
/// Entries are keyed by canonical path and revalidated against the file's modification time, so an
/// edited template is re-parsed on the next load.
#[derive(Default)]
pub struct TemplateStore {
    cache: RwLock<HashMap<PathBuf, CachedTemplate>>,
}

impl TemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a template, parsing it only when the cached copy is missing or stale.
    pub fn load(&self, path: &Path) -> Result<Arc<Template>, TemplateError> {
        // Unresolvable paths fall through to the parser, which reports them.
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let modified = std::fs::metadata(&key).and_then(|m| m.modified()).ok();

        if let Ok(cache) = self.cache.read()
            && let Some(hit) = cache.get(&key)
            && hit.modified.is_some()
            && hit.modified == modified
        {
            return Ok(hit.template.clone());
        }

        let (template, _) = parse_template_file(path)?;
        let template = Arc::new(template);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                key,
                CachedTemplate {
                    modified,
                    template: template.clone(),
                },
            );
        }
        Ok(template)
    }

    /// Field names of a template in declaration order.
    pub fn fields(&self, path: &Path) -> Result<Vec<String>, TemplateError> {
        Ok(self.load(path)?.field_names())
    }

    /// Drop every cached template.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/store.rs"]
mod tests;
