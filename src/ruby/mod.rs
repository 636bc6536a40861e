//! Phonetic annotation ("ruby") for CJK text.
//!
//! A [`Segmenter`] splits a sentence into [`TextSegment`]s, each with an
//! optional reading. [`annotate`] walks a content document, runs every text
//! node through the segmenter and rewrites it into plain text and `<ruby>`
//! groups.

mod annotate;
mod cantonese;
mod chinese;
mod japanese;
mod table;

use std::fmt;
use std::path::PathBuf;

pub use annotate::{annotate, trim_shared_suffix};
pub use cantonese::CantoneseSegmenter;
pub use chinese::ChineseSegmenter;
#[cfg(feature = "japanese")]
pub use japanese::LinderaAnalyzer;
pub use japanese::{
    JapaneseSegmenter, MorphAnalyzer, Morpheme, TableAnalyzer, katakana_to_hiragana,
};
pub use table::ReadingTable;

use crate::error::{Error, Result};

/// One piece of a segmented sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub surface: String,
    /// Reading to print above the surface, `None` for plain text.
    pub reading: Option<String>,
    /// The reading is a foreign-language gloss rather than a pronunciation.
    pub is_english_hint: bool,
}

impl TextSegment {
    pub fn plain(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            reading: None,
            is_english_hint: false,
        }
    }

    pub fn annotated(surface: impl Into<String>, reading: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            reading: Some(reading.into()),
            is_english_hint: false,
        }
    }

    pub fn hint(surface: impl Into<String>, gloss: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            reading: Some(gloss.into()),
            is_english_hint: true,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.reading.is_none()
    }
}

/// Splits text into segments with readings.
pub trait Segmenter: Send + Sync {
    /// Segment a whitespace-free run of text.
    fn segment(&self, text: &str) -> Result<Vec<TextSegment>>;
}

/// Languages with a segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubyLanguage {
    /// Mandarin readings in pinyin.
    Chinese,
    /// Kana readings from morphological analysis.
    Japanese,
    /// Cantonese readings in jyutping.
    Cantonese,
}

impl RubyLanguage {
    pub fn code(self) -> &'static str {
        match self {
            RubyLanguage::Chinese => "zh",
            RubyLanguage::Japanese => "ja",
            RubyLanguage::Cantonese => "cantonese",
        }
    }

    /// Resolve a declared `dc:language` tag.
    ///
    /// `zh` and its regional tags read as Chinese, or Cantonese when
    /// `cantonese` is set; `yue` is always Cantonese. Any other language
    /// has no segmenter.
    pub fn from_declared(tag: &str, cantonese: bool) -> Result<Self> {
        let lower = tag.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "ja" | "jpn" => Ok(RubyLanguage::Japanese),
            "yue" => Ok(RubyLanguage::Cantonese),
            "zh" | "zho" | "chi" | "cmn" if cantonese => Ok(RubyLanguage::Cantonese),
            "zh" | "zho" | "chi" | "cmn" => Ok(RubyLanguage::Chinese),
            _ => Err(Error::UnsupportedLanguage(tag.trim().to_string())),
        }
    }

    /// Map a detected language code. Korean detections are only trusted as
    /// Cantonese (short Han-heavy text is often misread as Korean).
    pub fn from_detected(code: &str, cantonese: bool) -> Option<Self> {
        match code {
            "ja" => Some(RubyLanguage::Japanese),
            "zh" if cantonese => Some(RubyLanguage::Cantonese),
            "zh" => Some(RubyLanguage::Chinese),
            "ko" if cantonese => Some(RubyLanguage::Cantonese),
            _ => None,
        }
    }
}

impl fmt::Display for RubyLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Inputs a segmenter may need beyond the language.
#[derive(Debug, Clone, Default)]
pub struct SegmenterOptions {
    /// Extra jyutping entries merged over the built-in table.
    pub jyutping_table: Option<PathBuf>,
}

/// Build the segmenter for `language`.
pub fn build_segmenter(
    language: RubyLanguage,
    options: &SegmenterOptions,
) -> Result<Box<dyn Segmenter>> {
    match language {
        RubyLanguage::Chinese => Ok(Box::new(ChineseSegmenter::new())),
        RubyLanguage::Cantonese => {
            let mut table = ReadingTable::jyutping();
            if let Some(path) = &options.jyutping_table {
                table.merge(ReadingTable::from_tsv(&std::fs::read_to_string(path)?));
            }
            Ok(Box::new(CantoneseSegmenter::new(table)))
        }
        RubyLanguage::Japanese => japanese_segmenter(),
    }
}

#[cfg(feature = "japanese")]
fn japanese_segmenter() -> Result<Box<dyn Segmenter>> {
    let analyzer = LinderaAnalyzer::new()?;
    Ok(Box::new(JapaneseSegmenter::new(Box::new(analyzer))))
}

#[cfg(not(feature = "japanese"))]
fn japanese_segmenter() -> Result<Box<dyn Segmenter>> {
    Ok(Box::new(JapaneseSegmenter::new(Box::new(
        TableAnalyzer::builtin(),
    ))))
}
