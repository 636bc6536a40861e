//! Fixture books built on the fly.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// PNG signature plus a few bytes that are not valid UTF-8.
pub const IMAGE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0xfe, 0x00, 0x80];

/// A small book: one chapter, an image, optionally a stylesheet.
#[derive(Debug, Clone)]
pub struct FixtureBook {
    pub language: Option<String>,
    pub stylesheet: Option<String>,
    pub body: String,
    pub progression: Option<String>,
    pub extra: Vec<(String, Vec<u8>)>,
}

impl FixtureBook {
    pub fn new(body: &str) -> Self {
        Self {
            language: None,
            stylesheet: None,
            body: body.to_string(),
            progression: None,
            extra: Vec::new(),
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn stylesheet(mut self, css: &str) -> Self {
        self.stylesheet = Some(css.to_string());
        self
    }

    pub fn progression(mut self, direction: &str) -> Self {
        self.progression = Some(direction.to_string());
        self
    }

    pub fn file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.extra.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn opf(&self) -> String {
        let language = self
            .language
            .as_ref()
            .map(|l| format!("\n    <dc:language>{l}</dc:language>"))
            .unwrap_or_default();
        let css_item = if self.stylesheet.is_some() {
            "\n    <item id=\"css\" href=\"Styles/main%20style.css\" media-type=\"text/css\"/>"
        } else {
            ""
        };
        let progression = self
            .progression
            .as_ref()
            .map(|p| format!(" page-progression-direction=\"{p}\""))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:title>Fixture</dc:title>{language}
  </metadata>
  <manifest>
    <item id="c1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="img" href="Images/cover.png" media-type="image/png"/>{css_item}
  </manifest>
  <spine{progression}>
    <itemref idref="c1"/>
  </spine>
</package>"#
        )
    }

    pub fn chapter(&self) -> String {
        let link = if self.stylesheet.is_some() {
            "<link rel=\"stylesheet\" href=\"../Styles/main%20style.css\" type=\"text/css\"/>"
        } else {
            ""
        };
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter</title>{link}</head><body>{}</body></html>"#,
            self.body
        )
    }

    /// Write the book to `dir/name` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let mut files: Vec<(String, Vec<u8>)> = vec![
            ("META-INF/container.xml".into(), CONTAINER.as_bytes().to_vec()),
            ("OEBPS/content.opf".into(), self.opf().into_bytes()),
            ("OEBPS/Text/chapter1.xhtml".into(), self.chapter().into_bytes()),
            ("OEBPS/Images/cover.png".into(), IMAGE.to_vec()),
        ];
        if let Some(css) = &self.stylesheet {
            files.push(("OEBPS/Styles/main style.css".into(), css.as_bytes().to_vec()));
        }
        files.extend(self.extra.iter().cloned());
        write_epub(&dir.join(name), &files)
    }
}

/// Zip `files` into an EPUB, `mimetype` first and stored.
pub fn write_epub(path: &Path, files: &[(String, Vec<u8>)]) -> PathBuf {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    for (name, bytes) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

pub fn read_entry_bytes(epub: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(epub).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

pub fn read_entry(epub: &Path, name: &str) -> String {
    String::from_utf8(read_entry_bytes(epub, name)).unwrap()
}

pub fn entry_names(epub: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(epub).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}
