// file: src/workspace/mod.rs
// description: output workspace module exports
// reference: internal module structure

pub mod builder;

pub use builder::{EXTRACTION_DIR_NAME, TEXT_DIR_NAME, WorkspaceBuilder, WorkspaceLayout};
