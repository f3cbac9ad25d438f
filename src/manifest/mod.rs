// file: src/manifest/mod.rs
// description: manifest module exports
// reference: internal module structure

pub mod reader;

pub use reader::ManifestReader;
