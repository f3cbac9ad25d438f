// file: src/identifiers/allocator.rs
// description: resolves or synthesizes the subject identifier file for a run
// reference: https://doc.rust-lang.org/std/io/struct.BufWriter.html

use crate::error::{InputKind, PipelineError, Result};
use crate::manifest::ManifestReader;
use crate::utils::Validator;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of SID resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSids {
    pub path: PathBuf,
    pub generated: bool,
}

pub struct IdentifierAllocator {
    file_name: String,
}

impl IdentifierAllocator {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// A supplied SID file is validated and returned untouched. It must hold at
    /// least one entry. Without one, `0..count` is written one per line to
    /// `<text_dir>/<file_name>`.
    pub fn resolve(
        &self,
        sid_source: Option<&Path>,
        count: usize,
        text_dir: &Path,
    ) -> Result<ResolvedSids> {
        match sid_source {
            Some(path) => {
                Validator::require_input_file(path, InputKind::SidFile)?;
                let found = ManifestReader::count(path, InputKind::SidFile)?;
                if found != count {
                    // supplied SIDs are never rejected on length
                    warn!(
                        sid_file = %path.display(),
                        found,
                        expected = count,
                        "SID file length differs from subject count"
                    );
                }
                Ok(ResolvedSids {
                    path: path.to_path_buf(),
                    generated: false,
                })
            }
            None => {
                let path = text_dir.join(&self.file_name);
                Self::write_sequential(&path, count)?;
                Ok(ResolvedSids {
                    path,
                    generated: true,
                })
            }
        }
    }

    fn write_sequential(path: &Path, count: usize) -> Result<()> {
        let allocation_error = |source: std::io::Error| PipelineError::Allocation {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(allocation_error)?;
        let mut writer = BufWriter::new(file);
        for sid in 0..count {
            writeln!(writer, "{}", sid).map_err(allocation_error)?;
        }
        writer.flush().map_err(allocation_error)?;

        debug!(path = %path.display(), count, "Generated sequential SIDs");
        Ok(())
    }
}

impl Default for IdentifierAllocator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SID_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generates_ascending_sids() {
        let temp = TempDir::new().unwrap();
        let allocator = IdentifierAllocator::default();

        let resolved = allocator.resolve(None, 3, temp.path()).unwrap();

        assert!(resolved.generated);
        assert_eq!(resolved.path, temp.path().join("sids.txt"));
        assert_eq!(fs::read_to_string(&resolved.path).unwrap(), "0\n1\n2\n");
    }

    #[test]
    fn test_generated_line_count_matches_subjects() {
        let temp = TempDir::new().unwrap();
        let allocator = IdentifierAllocator::new("ids.txt");

        for count in [1usize, 7, 120] {
            let resolved = allocator.resolve(None, count, temp.path()).unwrap();
            let content = fs::read_to_string(&resolved.path).unwrap();
            let lines: Vec<usize> = content.lines().map(|l| l.parse().unwrap()).collect();
            assert_eq!(lines, (0..count).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_supplied_file_is_returned_untouched() {
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("custom_sids.txt");
        fs::write(&custom, "sub-A\nsub-B\n").unwrap();
        let text_dir = temp.path().join("text_files");
        fs::create_dir(&text_dir).unwrap();

        let resolved = IdentifierAllocator::default()
            .resolve(Some(custom.as_path()), 5, &text_dir)
            .unwrap();

        assert!(!resolved.generated);
        assert_eq!(resolved.path, custom);
        assert_eq!(fs::read_to_string(&custom).unwrap(), "sub-A\nsub-B\n");
        assert!(!text_dir.join("sids.txt").exists());
    }

    #[test]
    fn test_missing_supplied_file() {
        let temp = TempDir::new().unwrap();
        let absent = temp.path().join("absent.txt");
        let err = IdentifierAllocator::default()
            .resolve(Some(absent.as_path()), 2, temp.path())
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::NotFound {
                kind: InputKind::SidFile,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_supplied_file_rejected() {
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("custom_sids.txt");
        fs::write(&custom, "\n  \n").unwrap();

        let err = IdentifierAllocator::default()
            .resolve(Some(custom.as_path()), 3, temp.path())
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyManifest(ref p) if *p == custom));
        assert!(!temp.path().join("sids.txt").exists());
    }

    #[test]
    fn test_unwritable_target_is_allocation_error() {
        let temp = TempDir::new().unwrap();
        let err = IdentifierAllocator::default()
            .resolve(None, 2, &temp.path().join("missing_dir"))
            .unwrap_err();

        assert!(matches!(err, PipelineError::Allocation { .. }));
    }
}
