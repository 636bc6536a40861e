//! Unpack, rewrite and repack one book at a time.
//!
//! ```no_run
//! use std::path::Path;
//! use yokotate::config::{Direction, TransformConfig};
//! use yokotate::pipeline::EpubProcessor;
//!
//! let processor = EpubProcessor::new(TransformConfig::new(Direction::Vertical));
//! let output = processor.run(Path::new("book.epub"), Path::new("."))?;
//! println!("wrote {}", output.display());
//! # Ok::<(), yokotate::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::config::TransformConfig;
use crate::convert::{Converter, StageConfig, build_stages};
use crate::css::Stylesheet;
use crate::detect;
use crate::dom;
use crate::epub::{self, PackageDocument};
use crate::error::{Error, Result};
use crate::ruby::RubyLanguage;
use crate::util;

/// Extensions of content documents.
const CONTENT_EXTENSIONS: &[&str] = &["html", "xhtml", "htm"];

/// Hex digits of the content hash used in working directory names.
const HASH_PREFIX_LEN: usize = 16;

/// One extracted book.
#[derive(Debug, Clone)]
pub struct Book {
    pub source: PathBuf,
    /// File name up to the first dot.
    pub name: String,
    /// Working directory holding the extracted files.
    pub root: PathBuf,
    pub opf_path: PathBuf,
    pub content_paths: Vec<PathBuf>,
    /// Manifest-declared stylesheets that exist on disk.
    pub css_paths: Vec<PathBuf>,
}

impl Book {
    pub fn has_stylesheet(&self) -> bool {
        !self.css_paths.is_empty()
    }

    /// Directory holding the package document.
    pub fn opf_dir(&self) -> &Path {
        self.opf_path.parent().unwrap_or(&self.root)
    }
}

/// Result of one book in a batch.
#[derive(Debug)]
pub struct BookOutcome {
    pub source: PathBuf,
    pub result: Result<PathBuf>,
}

/// Runs the conversion stages over books.
#[derive(Debug, Clone)]
pub struct EpubProcessor {
    config: TransformConfig,
}

impl EpubProcessor {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Extract `source` into its working directory and find its documents.
    pub fn open(&self, source: &Path) -> Result<Book> {
        if !source.is_file() || !has_extension(source, "epub") {
            return Err(Error::InvalidInput(format!(
                "{} is not an .epub file",
                source.display()
            )));
        }

        let name = util::book_name(source);
        let hash = util::sha256_hex(&fs::read(source)?);
        let root = self
            .config
            .work_root
            .join(format!("{name}-{}", &hash[..HASH_PREFIX_LEN]));
        epub::extract(source, &root)?;
        log::debug!("extracted {} to {}", source.display(), root.display());

        let mut opfs = epub::find_by_extension(&root, &["opf"])?;
        let opf_path = match opfs.len() {
            1 => opfs.remove(0),
            0 => return Err(Error::MalformedPackage("no package document".into())),
            n => {
                return Err(Error::MalformedPackage(format!(
                    "{n} package documents, expected one"
                )));
            }
        };

        let opf = PackageDocument::parse(&util::read_text(&opf_path)?)?;
        let opf_dir = opf_path.parent().unwrap_or(&root).to_path_buf();
        let mut css_paths = Vec::new();
        for item in opf.manifest_items() {
            if item.media_type != "text/css" {
                continue;
            }
            let href = percent_decode_str(&item.href).decode_utf8_lossy();
            let path = opf_dir.join(href.as_ref());
            if path.is_file() {
                css_paths.push(path);
            } else {
                log::warn!("manifest stylesheet {} is missing", item.href);
            }
        }

        let content_paths = epub::find_by_extension(&root, CONTENT_EXTENSIONS)?;

        Ok(Book {
            source: source.to_path_buf(),
            name,
            root,
            opf_path,
            content_paths,
            css_paths,
        })
    }

    /// Pick the ruby language for `book`: the declared `dc:language` if any,
    /// otherwise the majority of per-document detections.
    ///
    /// A declared language without a segmenter is an error; an undetectable
    /// one turns ruby off for this book.
    pub fn resolve_ruby_language(
        &self,
        book: &Book,
        opf: &PackageDocument,
    ) -> Result<Option<RubyLanguage>> {
        if !self.config.ruby {
            return Ok(None);
        }
        if let Some(tag) = opf.language().filter(|tag| !tag.trim().is_empty()) {
            return RubyLanguage::from_declared(&tag, self.config.cantonese).map(Some);
        }

        let mut votes = Vec::new();
        for path in &book.content_paths {
            let document = dom::parse(&util::read_text(path)?);
            let root = document
                .find_by_tag("body")
                .unwrap_or_else(|| document.document());
            if let Some(code) = detect::detect_language(&document.collect_text(root)) {
                votes.push(code);
            }
        }
        let detected = detect::majority(votes)
            .and_then(|code| RubyLanguage::from_detected(code, self.config.cantonese));
        if detected.is_none() {
            log::warn!(
                "{}: no language declared or detected, ruby disabled",
                book.name
            );
        }
        Ok(detected)
    }

    /// Run `stages` over an opened book, rewriting its files in place.
    pub fn process(&self, book: &Book, stages: &mut [Box<dyn Converter>]) -> Result<()> {
        let mut opf = PackageDocument::parse(&util::read_text(&book.opf_path)?)?;
        let stage_config = StageConfig::new(&self.config, self.resolve_ruby_language(book, &opf)?);
        for stage in stages.iter_mut() {
            stage.receive_config(&stage_config)?;
        }

        if book.has_stylesheet() {
            for path in &book.css_paths {
                let mut stylesheet = Stylesheet::parse(&util::read_text(path)?)
                    .inspect_err(|e| log::warn!("{}: {e}", path.display()))?;
                for stage in stages.iter_mut() {
                    stage.process_css(&mut stylesheet)?;
                }
                fs::write(path, stylesheet.to_css())?;
                log::debug!("rewrote {}", path.display());
            }
        } else {
            for stage in stages.iter_mut() {
                stage.handle_missing_css(book.opf_dir())?;
            }
        }

        for stage in stages.iter_mut() {
            stage.process_opf(&mut opf)?;
        }
        fs::write(&book.opf_path, util::force_utf8_declaration(&opf.to_xml()).as_bytes())?;

        for path in &book.content_paths {
            let original = util::read_text(path)?;
            let mut text = original.clone();
            for stage in stages.iter_mut() {
                text = stage.process_content(&text, path)?;
            }
            if text != original {
                fs::write(path, util::force_utf8_declaration(&text).as_bytes())?;
                log::debug!("rewrote {}", path.display());
            }
        }
        Ok(())
    }

    /// Output file name for `book`.
    pub fn output_name(&self, book: &Book) -> String {
        let script = self
            .config
            .script
            .map(|s| s.as_str())
            .unwrap_or("original");
        let ruby = if self.config.ruby { "-ruby" } else { "" };
        format!(
            "{}-{}-{script}{ruby}.epub",
            book.name,
            self.config.direction.tag()
        )
    }

    /// Pack `book` into `dest_dir` and remove its working directory.
    pub fn pack(&self, book: &Book, dest_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)?;
        let output = dest_dir.join(self.output_name(book));
        epub::pack(&book.root, &output)?;
        fs::remove_dir_all(&book.root)?;
        log::info!("{} -> {}", book.source.display(), output.display());
        Ok(output)
    }

    /// Convert one book with the configured stages.
    pub fn run(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        self.run_with(source, dest_dir, build_stages(&self.config))
    }

    /// Convert one book with caller-supplied stages.
    pub fn run_with(
        &self,
        source: &Path,
        dest_dir: &Path,
        mut stages: Vec<Box<dyn Converter>>,
    ) -> Result<PathBuf> {
        let book = self.open(source)?;
        log::info!("processing {}", book.name);
        self.process(&book, &mut stages)?;
        self.pack(&book, dest_dir)
    }

    /// Convert every book, carrying on past failures.
    pub fn run_batch(&self, sources: &[PathBuf], dest_dir: &Path) -> Vec<BookOutcome> {
        sources
            .iter()
            .map(|source| {
                let result = self.run(source, dest_dir);
                if let Err(e) = &result {
                    log::error!("{}: {e}", source.display());
                }
                BookOutcome {
                    source: source.clone(),
                    result,
                }
            })
            .collect()
    }
}

/// The books named by `input`: the file itself, or every `.epub` below a
/// directory.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        return epub::find_epubs(input);
    }
    if input.is_file() && has_extension(input, "epub") {
        return Ok(vec![input.to_path_buf()]);
    }
    Err(Error::InvalidInput(format!(
        "{} is neither an .epub file nor a directory",
        input.display()
    )))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, ScriptConversion};
    use tempfile::TempDir;

    #[test]
    fn test_rejects_non_epub() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "x").unwrap();
        let processor = EpubProcessor::new(TransformConfig::default());
        assert!(matches!(processor.open(&path), Err(Error::InvalidInput(_))));
        assert!(matches!(
            processor.open(&dir.path().join("missing.epub")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(collect_inputs(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_output_name() {
        let book = Book {
            source: PathBuf::from("My.Book.epub"),
            name: "My".to_string(),
            root: PathBuf::new(),
            opf_path: PathBuf::new(),
            content_paths: Vec::new(),
            css_paths: Vec::new(),
        };
        let plain = EpubProcessor::new(TransformConfig::new(Direction::Vertical));
        assert_eq!(plain.output_name(&book), "My-v-original.epub");

        let full = EpubProcessor::new(
            TransformConfig::new(Direction::Horizontal)
                .with_script(ScriptConversion::S2tw)
                .with_ruby(true),
        );
        assert_eq!(full.output_name(&book), "My-h-s2tw-ruby.epub");
    }

    #[test]
    fn test_collect_inputs_walks_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.epub"), "").unwrap();
        fs::write(dir.path().join("nested/a.EPUB"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        let found = collect_inputs(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
    }
}
