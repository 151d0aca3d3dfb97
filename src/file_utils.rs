use anyhow::{Context, Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// @module: File and directory utilities

/// Characters kept in generated file names
static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// A file copied into the document store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Location of the copy
    pub path: PathBuf,
    /// Hex SHA-256 of the content
    pub sha256: String,
    pub size_bytes: u64,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write bytes to a file, refusing to replace an existing one unless `overwrite`
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8], overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if Self::file_exists(path) && !overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?} (use --force to overwrite)",
                path
            ));
        }

        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(path, content).with_context(|| format!("Failed to write to file: {:?}", path))
    }

    /// Prefix a report file name with a slug, e.g. `summer-gala-event-report.docx`
    pub fn report_file_name(label: &str, file_name: &str) -> String {
        let slug = UNSAFE_FILENAME_CHARS
            .replace_all(label.trim(), "-")
            .trim_matches('-')
            .to_lowercase();
        if slug.is_empty() {
            file_name.to_string()
        } else {
            format!("{}-{}", slug, file_name)
        }
    }

    /// Hex SHA-256 and size of a file, read in chunks
    pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<(String, u64)> {
        let path = path.as_ref();
        let mut file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        let mut size = 0u64;

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).with_context(|| format!("Failed to read file: {:?}", path)),
            };
            hasher.update(&buffer[..read]);
            size += read as u64;
        }

        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Ok((hex, size))
    }

    /// Copy a file into `store_dir` under a fresh `<uuid>.<ext>` name
    pub fn store_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, store_dir: P2) -> Result<StoredFile> {
        let from = from.as_ref();
        if !Self::file_exists(from) {
            return Err(anyhow!("Source file does not exist: {:?}", from));
        }

        let store_dir = store_dir.as_ref();
        Self::ensure_dir(store_dir)?;

        let mut stored_name = Uuid::new_v4().to_string();
        if let Some(ext) = from.extension() {
            stored_name.push('.');
            stored_name.push_str(&ext.to_string_lossy().to_lowercase());
        }
        let target = store_dir.join(stored_name);

        let copied = fs::copy(from, &target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, target))
            .and_then(|_| Self::hash_file(&target));
        let (sha256, size_bytes) = Self::discard_on_error(&target, copied)?;

        Ok(StoredFile {
            path: target,
            sha256,
            size_bytes,
        })
    }

    /// Remove a partially written `target` when `result` is an error
    fn discard_on_error<T>(target: &Path, result: Result<T>) -> Result<T> {
        if result.is_err() && target.exists() {
            if let Err(e) = fs::remove_file(target) {
                warn!("Failed to remove partial copy {:?}: {}", target, e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writeBytes_existingFile_shouldRequireOverwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("report.docx");

        FileManager::write_bytes(&path, b"first", false).unwrap();
        assert!(FileManager::write_bytes(&path, b"second", false).is_err());
        FileManager::write_bytes(&path, b"second", true).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_hashFile_shouldMatchKnownDigest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();

        let (hash, size) = FileManager::hash_file(&path).unwrap();
        assert_eq!(hash, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(size, 3);
    }

    #[test]
    fn test_storeFile_shouldKeepExtensionUnderNewName() {
        let source_dir = tempdir().unwrap();
        let store = tempdir().unwrap();
        let source = source_dir.path().join("Delivery Note.PDF");
        fs::write(&source, b"%PDF-1.7").unwrap();

        let stored = FileManager::store_file(&source, store.path()).unwrap();

        assert_eq!(stored.path.extension().unwrap(), "pdf");
        assert_ne!(stored.path.file_name().unwrap(), "Delivery Note.PDF");
        assert_eq!(stored.size_bytes, 8);
        assert!(FileManager::file_exists(&stored.path));
    }

    #[test]
    fn test_storeFile_missingSource_shouldFail() {
        let store = tempdir().unwrap();
        assert!(FileManager::store_file(store.path().join("nope.pdf"), store.path()).is_err());
    }

    #[test]
    fn test_discardOnError_shouldRemoveOnlyFailedCopies() {
        let store = tempdir().unwrap();
        let failed = store.path().join("failed.pdf");
        let kept = store.path().join("kept.pdf");
        fs::write(&failed, b"partial").unwrap();
        fs::write(&kept, b"complete").unwrap();

        let err = FileManager::discard_on_error::<()>(&failed, Err(anyhow!("read interrupted")));
        let ok = FileManager::discard_on_error(&kept, Ok(8u64));

        assert!(err.is_err());
        assert!(!failed.exists());
        assert_eq!(ok.unwrap(), 8);
        assert!(kept.exists());
    }

    #[test]
    fn test_reportFileName_shouldSlugLabel() {
        assert_eq!(
            FileManager::report_file_name("Summer Gala / 2026", "event-report.docx"),
            "summer-gala-2026-event-report.docx"
        );
        assert_eq!(FileManager::report_file_name("  ", "x.docx"), "x.docx");
    }
}
