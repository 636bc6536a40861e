//! Japanese readings from morphological analysis.

use super::{ReadingTable, Segmenter, TextSegment};
use crate::error::Result;

/// One token from a morphological analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Morpheme {
    pub surface: String,
    /// Reading in katakana or hiragana; `None` or `*` when unknown.
    pub kana: Option<String>,
    /// Dictionary form. UniDic-style lemmas carry an English gloss after a
    /// hyphen, e.g. `パン-pão`.
    pub lemma: Option<String>,
}

/// Tokenizes Japanese text.
pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>>;
}

/// [`MorphAnalyzer`] over a [`ReadingTable`]: greedy longest match of
/// known words, everything between them left without a reading.
///
/// Used when the crate is built without the `japanese` feature.
#[derive(Debug, Clone)]
pub struct TableAnalyzer {
    table: ReadingTable,
}

impl TableAnalyzer {
    pub fn new(table: ReadingTable) -> Self {
        Self { table }
    }

    /// Analyzer over the built-in kana table.
    pub fn builtin() -> Self {
        Self::new(ReadingTable::kana())
    }
}

impl MorphAnalyzer for TableAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
        Ok(self
            .table
            .split(text)
            .into_iter()
            .map(|(surface, kana)| Morpheme {
                surface: surface.to_string(),
                kana: kana.map(str::to_string),
                lemma: None,
            })
            .collect())
    }
}

/// Map katakana to hiragana; everything else is left as is.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ァ'..='ヶ' | 'ヽ' | 'ヾ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            c => c,
        })
        .collect()
}

fn english_hint(lemma: &str) -> Option<String> {
    let (_, gloss) = lemma.split_once('-')?;
    let gloss: String = gloss
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    let gloss = gloss.trim();
    (!gloss.is_empty()).then(|| gloss.to_string())
}

/// Decide how one morpheme is shown.
pub(crate) fn morpheme_segment(morpheme: Morpheme) -> TextSegment {
    if let Some(hint) = morpheme.lemma.as_deref().and_then(english_hint) {
        return TextSegment::hint(morpheme.surface, hint);
    }
    let kana = match morpheme.kana.as_deref() {
        None | Some("") | Some("*") => return TextSegment::plain(morpheme.surface),
        Some(kana) => kana,
    };
    if morpheme.surface == kana {
        return TextSegment::plain(morpheme.surface);
    }
    let hiragana = katakana_to_hiragana(kana);
    if morpheme.surface == hiragana {
        return TextSegment::plain(morpheme.surface);
    }
    TextSegment::annotated(morpheme.surface, hiragana)
}

/// Japanese segmenter over any [`MorphAnalyzer`].
pub struct JapaneseSegmenter {
    analyzer: Box<dyn MorphAnalyzer>,
}

impl JapaneseSegmenter {
    pub fn new(analyzer: Box<dyn MorphAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl Segmenter for JapaneseSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<TextSegment>> {
        Ok(self
            .analyzer
            .analyze(text)?
            .into_iter()
            .filter(|m| !m.surface.is_empty())
            .map(morpheme_segment)
            .collect())
    }
}

#[cfg(feature = "japanese")]
mod lindera_backend {
    use lindera::{DictionaryConfig, DictionaryKind, Mode, Tokenizer, TokenizerConfig};

    use super::{MorphAnalyzer, Morpheme};
    use crate::error::{Error, Result};

    /// IPADIC detail columns.
    const LEMMA: usize = 6;
    const READING: usize = 7;

    /// [`MorphAnalyzer`] backed by lindera with the bundled IPADIC.
    pub struct LinderaAnalyzer {
        tokenizer: Tokenizer,
    }

    impl LinderaAnalyzer {
        pub fn new() -> Result<Self> {
            let config = TokenizerConfig {
                dictionary: DictionaryConfig {
                    kind: Some(DictionaryKind::IPADIC),
                    path: None,
                },
                user_dictionary: None,
                mode: Mode::Normal,
            };
            let tokenizer =
                Tokenizer::from_config(config).map_err(|e| Error::Segmentation(e.to_string()))?;
            Ok(Self { tokenizer })
        }
    }

    impl MorphAnalyzer for LinderaAnalyzer {
        fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
            let mut tokens = self
                .tokenizer
                .tokenize(text)
                .map_err(|e| Error::Segmentation(e.to_string()))?;
            Ok(tokens
                .iter_mut()
                .map(|token| {
                    let surface = token.text.to_string();
                    let details = token.get_details().unwrap_or_default();
                    Morpheme {
                        surface,
                        kana: details.get(READING).map(|s| s.to_string()),
                        lemma: details.get(LEMMA).map(|s| s.to_string()),
                    }
                })
                .collect())
        }
    }
}

#[cfg(feature = "japanese")]
pub use lindera_backend::LinderaAnalyzer;
