//! Tracklist renamer library - shared modules for the CLI and debug binaries.

pub mod ai;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod json_tree;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod page;
pub mod progress;
pub mod rename;
pub mod scan;
pub mod scoring;
pub mod template;
