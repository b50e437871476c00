//! Frame templates: the on-disk schema, its parser, and a parsed-template cache.

pub(crate) mod model;
pub(crate) mod parser;
pub(crate) mod store;
