//! Core types, configuration and errors shared by every other module.

pub mod config;
pub mod core;
pub mod error;
