//! Zip container I/O: unpack a book into a directory and pack it back.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::Result;

const MIMETYPE: &[u8] = b"application/epub+zip";

/// Extract `epub` into `dest`, replacing whatever was there.
pub fn extract(epub: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        log::debug!("overwriting working directory {}", dest.display());
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;

    let file = File::open(epub)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest)?;
    Ok(())
}

/// Pack the directory `src` into the EPUB file `dest`.
///
/// `mimetype` goes first and uncompressed; everything else is deflated in a
/// stable (sorted) order.
pub fn pack(src: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(file);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mimetype = match fs::read(src.join("mimetype")) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => MIMETYPE.to_vec(),
        Err(e) => return Err(e.into()),
    };
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(&mimetype)?;

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let name = archive_name(relative);
        if name == "mimetype" {
            continue;
        }

        zip.start_file(name, options_deflate)?;
        let mut input = File::open(entry.path())?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// Archive entry name for a relative path, always `/`-separated.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Files under `root` whose extension is one of `extensions`
/// (case-insensitive), sorted by path.
pub fn find_by_extension(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if matches {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Every `.epub` file below `dir`.
pub fn find_epubs(dir: &Path) -> Result<Vec<PathBuf>> {
    find_by_extension(dir, &["epub"])
}
