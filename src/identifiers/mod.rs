// file: src/identifiers/mod.rs
// description: subject identifier module exports
// reference: internal module structure

pub mod allocator;

pub use allocator::{IdentifierAllocator, ResolvedSids};
