use std::path::Path;

use super::{Converter, StageConfig};
use crate::dom;
use crate::error::Result;
use crate::ruby::{self, Segmenter};

/// Adds `<ruby>` readings to the body of every content document.
///
/// The segmenter is built from the book's resolved language; a book whose
/// language could not be resolved passes through untouched.
pub struct RubyConverter {
    segmenter: Option<Box<dyn Segmenter>>,
    injected: bool,
    parentheses: bool,
}

impl RubyConverter {
    pub fn new() -> Self {
        Self {
            segmenter: None,
            injected: false,
            parentheses: true,
        }
    }

    /// Use `segmenter` regardless of the book's language.
    pub fn with_segmenter(mut self, segmenter: Box<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self.injected = true;
        self
    }
}

impl Default for RubyConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for RubyConverter {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn receive_config(&mut self, config: &StageConfig) -> Result<()> {
        self.parentheses = config.ruby_parentheses;
        if self.injected {
            return Ok(());
        }
        self.segmenter = match config.ruby_language {
            Some(language) => {
                log::debug!("ruby language {language}");
                Some(ruby::build_segmenter(language, &config.segmenter_options)?)
            }
            None => None,
        };
        Ok(())
    }

    fn process_content(&mut self, html: &str, path: &Path) -> Result<String> {
        let Some(segmenter) = &self.segmenter else {
            return Ok(html.to_string());
        };
        let mut document = dom::parse(html);
        let Some(body) = document.find_by_tag("body") else {
            return Ok(html.to_string());
        };
        let created = ruby::annotate(&mut document, body, segmenter.as_ref(), self.parentheses)?;
        log::debug!("{}: {created} ruby groups", path.display());
        Ok(dom::serialize(&document, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, TransformConfig};
    use crate::ruby::{ReadingTable, RubyLanguage, TextSegment};

    struct Passthrough;

    impl Segmenter for Passthrough {
        fn segment(&self, text: &str) -> Result<Vec<TextSegment>> {
            Ok(vec![TextSegment::plain(text)])
        }
    }

    #[test]
    fn test_no_language_passes_through() {
        let mut stage = RubyConverter::new();
        let config = TransformConfig::new(Direction::Vertical).with_ruby(true);
        stage.receive_config(&StageConfig::new(&config, None)).unwrap();
        let html = "<html><body><p>中文</p></body></html>";
        assert_eq!(stage.process_content(html, Path::new("c.xhtml")).unwrap(), html);
    }

    #[test]
    fn test_plain_segments_make_no_ruby() {
        let mut stage = RubyConverter::new().with_segmenter(Box::new(Passthrough));
        let config = TransformConfig::new(Direction::Vertical).with_ruby(true);
        stage
            .receive_config(&StageConfig::new(&config, Some(RubyLanguage::Japanese)))
            .unwrap();
        let out = stage
            .process_content("<html><body><p>ひらがな</p></body></html>", Path::new("c.xhtml"))
            .unwrap();
        assert!(!out.contains("<ruby>"));
        assert!(out.contains("<p>ひらがな</p>"));
    }

    #[test]
    fn test_cantonese_readings() {
        let table = ReadingTable::from_tsv("唔該\tm4 goi1\n");
        let mut stage = RubyConverter::new()
            .with_segmenter(Box::new(ruby::CantoneseSegmenter::new(table)));
        let config = TransformConfig::new(Direction::Vertical)
            .with_ruby(true)
            .with_ruby_parentheses(false);
        stage
            .receive_config(&StageConfig::new(&config, Some(RubyLanguage::Cantonese)))
            .unwrap();
        let out = stage
            .process_content("<html><body><p>唔該你</p></body></html>", Path::new("c.xhtml"))
            .unwrap();
        assert!(out.contains("<p><ruby>唔該<rt>m4 goi1, </rt></ruby>你</p>"));
    }
}
