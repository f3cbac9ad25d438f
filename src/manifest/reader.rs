// file: src/manifest/reader.rs
// description: line-delimited manifest reading with streaming subject counts
// reference: https://doc.rust-lang.org/std/io/trait.BufRead.html

use crate::error::{InputKind, PipelineError, Result};
use crate::utils::Validator;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads manifests: text files with one file-system path per line.
///
/// Blank lines (including whitespace-only and `\r`-terminated ones) are not
/// entries. Counting streams the file line by line, so arbitrarily large
/// manifests never sit in memory.
pub struct ManifestReader;

impl ManifestReader {
    /// Number of non-empty lines in the manifest.
    ///
    /// Fails with `NotFound` if the file is missing and `EmptyManifest` if it
    /// holds no entries.
    pub fn count(path: &Path, kind: InputKind) -> Result<usize> {
        let reader = Self::open(path, kind)?;

        let mut count = 0;
        for line in reader.lines() {
            let line = line.map_err(|e| io_error(path, e))?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }

        if count == 0 {
            return Err(PipelineError::EmptyManifest(path.to_path_buf()));
        }

        debug!(manifest = %path.display(), entries = count, "Counted manifest entries");
        Ok(count)
    }

    /// The manifest entries in file order.
    pub fn read_entries(path: &Path, kind: InputKind) -> Result<Vec<PathBuf>> {
        let reader = Self::open(path, kind)?;

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| io_error(path, e))?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                entries.push(PathBuf::from(trimmed));
            }
        }

        if entries.is_empty() {
            return Err(PipelineError::EmptyManifest(path.to_path_buf()));
        }

        Ok(entries)
    }

    fn open(path: &Path, kind: InputKind) -> Result<BufReader<File>> {
        Validator::require_input_file(path, kind)?;
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::NotFound {
                    kind,
                    path: path.to_path_buf(),
                }
            } else {
                io_error(path, e)
            }
        })?;
        Ok(BufReader::new(file))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Validation(format!("Cannot read manifest {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_count_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            &temp,
            "nifti.txt",
            "/data/a.nii.gz\n\n/data/b.nii.gz\r\n   \n/data/c.nii.gz",
        );

        assert_eq!(ManifestReader::count(&path, InputKind::ImageManifest).unwrap(), 3);
    }

    #[test]
    fn test_count_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = ManifestReader::count(&temp.path().join("nope.txt"), InputKind::ImageManifest)
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::NotFound {
                kind: InputKind::ImageManifest,
                ..
            }
        ));
    }

    #[test]
    fn test_count_empty_manifest() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(&temp, "nifti.txt", "\n  \n\r\n");

        let err = ManifestReader::count(&path, InputKind::ImageManifest).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyManifest(p) if p == path));
    }

    #[test]
    fn test_read_entries_preserves_order() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(&temp, "mask.txt", "/m/2.nii\n/m/1.nii \n\n/m/3.nii\n");

        let entries = ManifestReader::read_entries(&path, InputKind::MaskManifest).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/m/2.nii"),
                PathBuf::from("/m/1.nii"),
                PathBuf::from("/m/3.nii"),
            ]
        );
    }
}
