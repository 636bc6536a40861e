use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use pinyin::ToPinyin;

use super::{Segmenter, TextSegment};
use crate::error::Result;

static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Mandarin segmenter: jieba word segmentation with toned pinyin readings.
///
/// Every word is annotated. Characters without a pinyin reading (Latin
/// letters, digits, punctuation) are read as themselves, which the suffix
/// trimming then turns back into plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChineseSegmenter;

impl ChineseSegmenter {
    pub fn new() -> Self {
        Self
    }
}

/// Space-separated toned pinyin for `word`; runs of characters without a
/// reading are kept together verbatim.
pub(crate) fn pinyin_reading(word: &str) -> String {
    let mut syllables: Vec<String> = Vec::new();
    let mut other = String::new();
    for c in word.chars() {
        match c.to_pinyin() {
            Some(p) => {
                if !other.is_empty() {
                    syllables.push(std::mem::take(&mut other));
                }
                syllables.push(p.with_tone().to_string());
            }
            None => other.push(c),
        }
    }
    if !other.is_empty() {
        syllables.push(other);
    }
    syllables.join(" ")
}

impl Segmenter for ChineseSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<TextSegment>> {
        Ok(JIEBA
            .cut(text, true)
            .into_iter()
            .filter(|word| !word.is_empty())
            .map(|word| TextSegment::annotated(word, pinyin_reading(word)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinyin_reading() {
        assert_eq!(pinyin_reading("中国"), "zhōng guó");
        assert_eq!(pinyin_reading("A股"), "A gǔ");
        assert_eq!(pinyin_reading("，"), "，");
    }

    #[test]
    fn test_every_word_gets_a_reading() {
        let segments = ChineseSegmenter::new().segment("我们中出了一个叛徒").unwrap();
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| s.reading.is_some()));
        let surface: String = segments.iter().map(|s| s.surface.as_str()).collect();
        assert_eq!(surface, "我们中出了一个叛徒");
    }
}
