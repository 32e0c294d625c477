//! Archive codec - wallet database <-> ZIP archive

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::domain::result::{Error, Result};

/// Default suffix of the wallet database file
pub const DEFAULT_DATABASE_SUFFIX: &str = ".sqlite3";

/// Builds and extracts backup archives
#[derive(Debug, Clone)]
pub struct ArchiveCodec {
    database_suffix: String,
}

impl Default for ArchiveCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_SUFFIX)
    }
}

impl ArchiveCodec {
    pub fn new(database_suffix: impl Into<String>) -> Self {
        Self {
            database_suffix: database_suffix.into(),
        }
    }

    /// Locate the database file in `source` (a directory or the file itself)
    ///
    /// Directories are searched recursively in name order; the first match wins.
    pub fn find_database(&self, source: &Path) -> Result<PathBuf> {
        if source.is_file() {
            return if self.is_database(source) {
                Ok(source.to_path_buf())
            } else {
                Err(Error::DbFileNotFound)
            };
        }
        if !source.is_dir() {
            return Err(Error::DbFileNotFound);
        }

        let mut pending = vec![source.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut children: Vec<PathBuf> = fs::read_dir(&dir)
                .map_err(|_| Error::DbFileNotFound)?
                .flatten()
                .map(|e| e.path())
                .collect();
            children.sort();

            let mut subdirs = Vec::new();
            for child in children {
                if child.is_dir() {
                    subdirs.push(child);
                } else if self.is_database(&child) {
                    return Ok(child);
                }
            }
            // Reverse so the stack pops directories in name order
            pending.extend(subdirs.into_iter().rev());
        }

        Err(Error::DbFileNotFound)
    }

    fn is_database(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().ends_with(&self.database_suffix))
            .unwrap_or(false)
    }

    /// Compress the wallet database found in `source` into `destination`
    ///
    /// The archive holds a single entry named after the database file.
    pub fn create_archive(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        let db_path = self.find_database(source)?;
        let entry_name = db_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(Error::DbFileNotFound)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(Error::archive)?;
        }

        if let Err(e) = write_single_entry(&db_path, &entry_name, destination) {
            // Don't leave a truncated archive behind for the next attempt
            let _ = fs::remove_file(destination);
            return Err(Error::archive(e));
        }

        debug!(archive = %destination.display(), entry = %entry_name, "archive created");
        Ok(destination.to_path_buf())
    }

    /// Unpack every entry of `archive` into `destination`
    pub fn extract_archive(&self, archive: &Path, destination: &Path) -> Result<()> {
        let file = File::open(archive).map_err(Error::unzip)?;
        let mut zip = ZipArchive::new(file).map_err(Error::unzip)?;
        fs::create_dir_all(destination).map_err(Error::unzip)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(Error::unzip)?;
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| Error::unzip(format!("entry '{}' escapes destination", entry.name())))?;
            let target = destination.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(Error::unzip)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(Error::unzip)?;
            }
            let mut out = File::create(&target).map_err(Error::unzip)?;
            io::copy(&mut entry, &mut out).map_err(Error::unzip)?;
        }

        debug!(archive = %archive.display(), entries = zip.len(), "archive extracted");
        Ok(())
    }

    /// SHA-256 of a file, hex encoded
    pub fn digest(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

fn write_single_entry(
    db_path: &Path,
    entry_name: &str,
    destination: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let size = fs::metadata(db_path)?.len();
    let file = File::create(destination)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(size >= u32::MAX as u64);

    zip.start_file(entry_name, options)?;
    let mut db_file = File::open(db_path)?;
    io::copy(&mut db_file, &mut zip)?;
    zip.finish()?;
    Ok(())
}
