//! Dataset archiving.
//!
//! Compresses a dataset directory into a `.zip` whose entry names are the
//! file paths relative to the dataset root, with forward-slash separators
//! regardless of host convention (the training service expects POSIX-style
//! names).

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use littleme_core::error::CoreError;

/// Compress `source_dir` into a zip archive at `archive_path`.
///
/// Only regular files become entries; empty directories are not
/// preserved. Fails with [`CoreError::InvalidInput`] before touching the
/// destination when `source_dir` is missing or not a directory.
pub fn zip_dataset(source_dir: &Path, archive_path: &Path) -> Result<PathBuf, CoreError> {
    if !source_dir.is_dir() {
        return Err(CoreError::InvalidInput(format!(
            "{} is not a directory",
            source_dir.display()
        )));
    }

    let file = File::create(archive_path).map_err(|source| CoreError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(source_dir, &mut files)?;
    // Deterministic entry order regardless of directory iteration order.
    files.sort();

    for path in &files {
        let name = entry_name(path, source_dir)?;
        writer
            .start_file(&name, options)
            .map_err(|e| CoreError::Internal(format!("zip write failed: {e}")))?;

        let mut input = File::open(path).map_err(|source| CoreError::Io {
            path: path.clone(),
            source,
        })?;
        std::io::copy(&mut input, &mut writer).map_err(|source| CoreError::Io {
            path: path.clone(),
            source,
        })?;
    }

    writer
        .finish()
        .map_err(|e| CoreError::Internal(format!("zip finish failed: {e}")))?;

    tracing::info!(
        archive = %archive_path.display(),
        files = files.len(),
        "Dataset archive written",
    );
    Ok(archive_path.to_path_buf())
}

/// Recursively gather regular files under `dir`.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CoreError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| CoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Entry name for `path`: relative to `base`, joined with `/`.
fn entry_name(path: &Path, base: &Path) -> Result<String, CoreError> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| CoreError::Internal(format!("{} escapes the dataset root", path.display())))?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    fn entry_names(archive_path: &Path) -> HashSet<String> {
        let file = File::open(archive_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn entries_are_paths_relative_to_the_dataset_root() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        std::fs::create_dir(&dataset).unwrap();
        std::fs::write(dataset.join("image1.jpg"), b"123").unwrap();
        std::fs::create_dir(dataset.join("nested")).unwrap();
        std::fs::write(dataset.join("nested/image2.jpg"), b"456").unwrap();

        let archive_path = dir.path().join("dataset.zip");
        let result = zip_dataset(&dataset, &archive_path).unwrap();

        assert!(result.exists());
        let names = entry_names(&archive_path);
        let expected: HashSet<String> =
            ["image1.jpg".to_string(), "nested/image2.jpg".to_string()]
                .into_iter()
                .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn entry_separators_are_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        std::fs::create_dir_all(dataset.join("a/b")).unwrap();
        std::fs::write(dataset.join("a/b/deep.jpg"), b"x").unwrap();

        let archive_path = dir.path().join("out.zip");
        zip_dataset(&dataset, &archive_path).unwrap();

        let names = entry_names(&archive_path);
        assert!(names.contains("a/b/deep.jpg"));
        assert!(names.iter().all(|n| !n.contains('\\')));
    }

    #[test]
    fn empty_directories_produce_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        std::fs::create_dir_all(dataset.join("empty")).unwrap();
        std::fs::write(dataset.join("only.jpg"), b"x").unwrap();

        let archive_path = dir.path().join("out.zip");
        zip_dataset(&dataset, &archive_path).unwrap();

        assert_eq!(entry_names(&archive_path).len(), 1);
    }

    #[test]
    fn missing_source_fails_before_creating_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.zip");

        let err = zip_dataset(&dir.path().join("missing"), &archive_path).unwrap_err();

        assert_matches!(err, CoreError::InvalidInput(_));
        assert!(!archive_path.exists());
    }

    #[test]
    fn file_as_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file.txt");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let err = zip_dataset(&not_a_dir, &dir.path().join("out.zip")).unwrap_err();
        assert_matches!(err, CoreError::InvalidInput(_));
    }

    #[test]
    fn archived_contents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        std::fs::create_dir(&dataset).unwrap();
        std::fs::write(dataset.join("photo.jpg"), b"pixels").unwrap();

        let archive_path = dir.path().join("out.zip");
        zip_dataset(&dataset, &archive_path).unwrap();

        let file = File::open(&archive_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_name("photo.jpg").unwrap();
        let mut contents = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut contents).unwrap();
        assert_eq!(contents, b"pixels");
    }
}
