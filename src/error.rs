//! Error types for yokotate operations.

use thiserror::Error;

/// Errors that can occur while transforming a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The given path is neither an EPUB file nor a directory.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Zero or several package documents, or a package document missing a
    /// required element.
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// Ruby was requested for a language with no segmenter.
    #[error("unsupported ruby language: {0}")]
    UnsupportedLanguage(String),

    #[error("stylesheet parse error at {line}:{column}: {message}")]
    StylesheetParse {
        line: u32,
        column: u32,
        message: String,
    },

    /// The script converter cannot express the requested conversion.
    #[error("unsupported script conversion: {0}")]
    UnsupportedConversion(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("segmentation failed: {0}")]
    Segmentation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
