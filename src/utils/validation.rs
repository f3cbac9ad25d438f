// file: src/utils/validation.rs
// description: input path validation and text helpers
// reference: input validation patterns

use crate::error::{InputKind, PipelineError, Result};
use std::path::Path;

pub struct Validator;

impl Validator {
    /// Fails with `NotFound` unless `path` points at an existing regular file.
    pub fn require_input_file(path: &Path, kind: InputKind) -> Result<()> {
        if !path.is_file() {
            return Err(PipelineError::NotFound {
                kind,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn is_bare_file_name(name: &str) -> bool {
        let path = Path::new(name);
        !name.trim().is_empty() && path.file_name() == Some(path.as_os_str())
    }

    /// Keeps the last `max_length` bytes of `text`, cut on a char boundary.
    pub fn tail_text(text: &str, max_length: usize) -> String {
        let trimmed = text.trim_end();
        if trimmed.len() <= max_length {
            return trimmed.to_string();
        }

        let mut start = trimmed.len() - max_length;
        while !trimmed.is_char_boundary(start) {
            start += 1;
        }
        format!("...{}", &trimmed[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_require_input_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("nifti.txt");
        fs::write(&file_path, "a.nii.gz\n").unwrap();

        assert!(Validator::require_input_file(&file_path, InputKind::ImageManifest).is_ok());

        let err = Validator::require_input_file(&temp.path().join("missing.txt"), InputKind::SidFile)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotFound {
                kind: InputKind::SidFile,
                ..
            }
        ));

        // a directory is not a manifest
        assert!(Validator::require_input_file(temp.path(), InputKind::MaskManifest).is_err());
    }

    #[test]
    fn test_is_bare_file_name() {
        assert!(Validator::is_bare_file_name("sids.txt"));
        assert!(!Validator::is_bare_file_name("dir/sids.txt"));
        assert!(!Validator::is_bare_file_name(""));
        assert!(!Validator::is_bare_file_name(".."));
    }

    #[test]
    fn test_tail_text() {
        assert_eq!(Validator::tail_text("short\n", 10), "short");
        assert_eq!(
            Validator::tail_text("this is a very long text", 9),
            "...long text"
        );
    }
}
