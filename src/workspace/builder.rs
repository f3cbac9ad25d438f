// file: src/workspace/builder.rs
// description: idempotent creation of the output workspace tree
// reference: https://doc.rust-lang.org/std/fs/fn.create_dir_all.html

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TEXT_DIR_NAME: &str = "text_files";
pub const EXTRACTION_DIR_NAME: &str = "extractions";

/// The directory tree one run writes into.
///
/// `text_dir` receives SIDs, intermediate manifests and reports;
/// `extraction_dir` receives per-subject extraction artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub text_dir: PathBuf,
    pub extraction_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            text_dir: root.join(TEXT_DIR_NAME),
            extraction_dir: root.join(EXTRACTION_DIR_NAME),
            root,
        }
    }
}

pub struct WorkspaceBuilder;

impl WorkspaceBuilder {
    /// Creates the root and both subdirectories, including missing ancestors.
    /// Directories that already exist are left alone.
    pub fn build(output_root: &Path) -> Result<WorkspaceLayout> {
        let layout = WorkspaceLayout::for_root(output_root);

        for dir in [&layout.root, &layout.text_dir, &layout.extraction_dir] {
            create_dir(dir)?;
        }

        Ok(layout)
    }
}

fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        debug!(path = %path.display(), "Workspace directory already present");
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|e| PipelineError::from_create_dir(path.to_path_buf(), e))?;
    debug!(path = %path.display(), "Created workspace directory");
    Ok(())
}
