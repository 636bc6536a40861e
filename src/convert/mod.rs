//! Conversion stages.
//!
//! A book is rewritten by an ordered list of [`Converter`]s. The pipeline
//! pushes one [`StageConfig`] into every stage, then calls the stylesheet
//! hooks, then the package document hook, then the content hook. Every hook
//! has a no-op default, so a stage only implements the documents it cares
//! about.
//!
//! # Example
//!
//! ```no_run
//! use yokotate::config::{Direction, TransformConfig};
//! use yokotate::convert::build_stages;
//!
//! let config = TransformConfig::new(Direction::Vertical).with_ruby(true);
//! let stages = build_stages(&config);
//! assert_eq!(stages.len(), 3);
//! ```

mod direction;
mod language;
mod ruby;

use std::path::Path;

pub use direction::DirectionConverter;
pub use language::LanguageConverter;
pub use ruby::RubyConverter;

use crate::config::{Direction, PunctuationPolicy, ScriptConversion, TransformConfig};
use crate::css::Stylesheet;
use crate::epub::PackageDocument;
use crate::error::Result;
use crate::ruby::{RubyLanguage, SegmenterOptions};

/// Settings frozen for one book and handed to every stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub direction: Direction,
    pub script: Option<ScriptConversion>,
    pub punctuation: PunctuationPolicy,
    /// Resolved ruby language; `None` when ruby is off or undetectable.
    pub ruby_language: Option<RubyLanguage>,
    pub ruby_parentheses: bool,
    pub segmenter_options: SegmenterOptions,
}

impl StageConfig {
    pub fn new(config: &TransformConfig, ruby_language: Option<RubyLanguage>) -> Self {
        Self {
            direction: config.direction,
            script: config.script,
            punctuation: config.punctuation,
            ruby_language,
            ruby_parentheses: config.ruby_parentheses,
            segmenter_options: SegmenterOptions {
                jyutping_table: config.jyutping_table.clone(),
            },
        }
    }
}

/// One rewriting stage.
pub trait Converter {
    /// Short name for log messages.
    fn name(&self) -> &'static str;

    /// Receive the per-book settings. Called once, before any document.
    fn receive_config(&mut self, _config: &StageConfig) -> Result<()> {
        Ok(())
    }

    /// Rewrite one manifest-declared stylesheet.
    fn process_css(&mut self, _stylesheet: &mut Stylesheet) -> Result<()> {
        Ok(())
    }

    /// Called instead of [`process_css`](Self::process_css) when the book
    /// declares no stylesheet. `opf_dir` is the package document's directory.
    fn handle_missing_css(&mut self, _opf_dir: &Path) -> Result<()> {
        Ok(())
    }

    fn process_opf(&mut self, _opf: &mut PackageDocument) -> Result<()> {
        Ok(())
    }

    /// Rewrite one content document. `path` is where the document lives.
    fn process_content(&mut self, html: &str, _path: &Path) -> Result<String> {
        Ok(html.to_string())
    }
}

/// Build the stages a configuration asks for, in run order: direction,
/// then script and punctuation, then ruby.
pub fn build_stages(config: &TransformConfig) -> Vec<Box<dyn Converter>> {
    let mut stages: Vec<Box<dyn Converter>> = Vec::new();
    stages.push(Box::new(match config.direction {
        Direction::Vertical => DirectionConverter::vertical(),
        Direction::Horizontal => DirectionConverter::horizontal(),
    }));
    if config.script.is_some() || config.punctuation != PunctuationPolicy::None {
        stages.push(Box::new(LanguageConverter::new()));
    }
    if config.ruby {
        stages.push(Box::new(RubyConverter::new()));
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(config: &TransformConfig) -> Vec<&'static str> {
        build_stages(config).iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_stage_order() {
        let config = TransformConfig::new(Direction::Vertical)
            .with_script(ScriptConversion::S2t)
            .with_ruby(true);
        assert_eq!(names(&config), vec!["vertical", "language", "ruby"]);
    }

    #[test]
    fn test_language_stage_skipped_without_work() {
        let config =
            TransformConfig::new(Direction::Horizontal).with_punctuation(PunctuationPolicy::None);
        assert_eq!(names(&config), vec!["horizontal"]);

        // Auto punctuation still needs the language stage.
        let config = TransformConfig::new(Direction::Horizontal);
        assert_eq!(names(&config), vec!["horizontal", "language"]);
    }

    #[test]
    fn test_stage_config_carries_options() {
        let config = TransformConfig::new(Direction::Vertical)
            .with_ruby_parentheses(false)
            .with_jyutping_table("extra.tsv");
        let stage = StageConfig::new(&config, Some(RubyLanguage::Cantonese));
        assert!(!stage.ruby_parentheses);
        assert_eq!(stage.ruby_language, Some(RubyLanguage::Cantonese));
        assert_eq!(
            stage.segmenter_options.jyutping_table.as_deref(),
            Some(Path::new("extra.tsv"))
        );
    }
}
