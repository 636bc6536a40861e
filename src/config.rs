//! Per-run transform configuration.
//!
//! A [`TransformConfig`] is built once from caller input and never changes
//! during a run. Everything a stage needs per book is frozen into a
//! [`StageConfig`](crate::convert::StageConfig) by the pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::punctuation::Locale;

/// Target reading direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Vertical,
    Horizontal,
}

impl Direction {
    /// Spine `page-progression-direction` value.
    pub fn progression(self) -> &'static str {
        match self {
            Direction::Vertical => "rtl",
            Direction::Horizontal => "ltr",
        }
    }

    /// `primary-writing-mode` meta value.
    pub fn writing_mode(self) -> &'static str {
        match self {
            Direction::Vertical => "vertical-rl",
            Direction::Horizontal => "horizontal-lr",
        }
    }

    /// Single-letter tag used in output file names.
    pub fn tag(self) -> &'static str {
        match self {
            Direction::Vertical => "v",
            Direction::Horizontal => "h",
        }
    }

    /// Infer the direction from a `primary-writing-mode` value.
    ///
    /// Anything other than `vertical-rl` reads as horizontal.
    pub fn from_writing_mode(mode: Option<&str>) -> Self {
        match mode {
            Some("vertical-rl") => Direction::Vertical,
            _ => Direction::Horizontal,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "to_vertical" | "vertical" | "v" => Ok(Direction::Vertical),
            "to_horizontal" | "horizontal" | "h" => Ok(Direction::Horizontal),
            other => Err(Error::InvalidOption(format!(
                "direction must be to_vertical or to_horizontal, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Vertical => f.write_str("to_vertical"),
            Direction::Horizontal => f.write_str("to_horizontal"),
        }
    }
}

/// Chinese script conversion identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptConversion {
    /// Simplified to Traditional.
    S2t,
    /// Traditional to Simplified.
    T2s,
    /// Simplified to Traditional (Taiwan standard).
    S2tw,
    /// Traditional (Taiwan standard) to Simplified.
    Tw2s,
    /// Simplified to Traditional (Hong Kong variant).
    S2hk,
    /// Traditional (Hong Kong variant) to Simplified.
    Hk2s,
    /// Simplified to Traditional (Taiwan standard, with phrases).
    S2twp,
    /// Traditional (Taiwan standard, with phrases) to Simplified.
    Tw2sp,
    /// Traditional to Taiwan standard.
    T2tw,
    /// Hong Kong variant to Traditional.
    Hk2t,
    /// Traditional to Hong Kong variant.
    T2hk,
    /// Traditional (Kyūjitai) to New Japanese Kanji.
    T2jp,
    /// New Japanese Kanji to Traditional (Kyūjitai).
    Jp2t,
    /// Taiwan standard to Traditional.
    Tw2t,
}

impl ScriptConversion {
    pub const ALL: [ScriptConversion; 14] = [
        ScriptConversion::S2t,
        ScriptConversion::T2s,
        ScriptConversion::S2tw,
        ScriptConversion::Tw2s,
        ScriptConversion::S2hk,
        ScriptConversion::Hk2s,
        ScriptConversion::S2twp,
        ScriptConversion::Tw2sp,
        ScriptConversion::T2tw,
        ScriptConversion::Hk2t,
        ScriptConversion::T2hk,
        ScriptConversion::T2jp,
        ScriptConversion::Jp2t,
        ScriptConversion::Tw2t,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptConversion::S2t => "s2t",
            ScriptConversion::T2s => "t2s",
            ScriptConversion::S2tw => "s2tw",
            ScriptConversion::Tw2s => "tw2s",
            ScriptConversion::S2hk => "s2hk",
            ScriptConversion::Hk2s => "hk2s",
            ScriptConversion::S2twp => "s2twp",
            ScriptConversion::Tw2sp => "tw2sp",
            ScriptConversion::T2tw => "t2tw",
            ScriptConversion::Hk2t => "hk2t",
            ScriptConversion::T2hk => "t2hk",
            ScriptConversion::T2jp => "t2jp",
            ScriptConversion::Jp2t => "jp2t",
            ScriptConversion::Tw2t => "tw2t",
        }
    }

    /// Punctuation locales implied by this conversion, e.g. `s2twp` gives
    /// (`hans`, `hant`).
    pub fn locale_pair(self) -> (Locale, Locale) {
        split_locale_pair(self.as_str()).unwrap_or((Locale::Hant, Locale::Hant))
    }
}

impl FromStr for ScriptConversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScriptConversion::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::InvalidOption(format!("unknown script conversion {s:?}")))
    }
}

impl fmt::Display for ScriptConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How quotation punctuation is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PunctuationPolicy {
    /// Derive locales from the script conversion and direction.
    #[default]
    Auto,
    /// Leave punctuation alone.
    None,
    /// Convert between an explicit locale pair (`s2t`, `t2s`, ...).
    Explicit { source: Locale, target: Locale },
}

impl PunctuationPolicy {
    /// Resolve the effective locale pair, or `None` when punctuation is left
    /// untouched.
    ///
    /// `auto` without a script conversion quotes simplified to traditional
    /// in vertical mode and traditional to traditional in horizontal mode.
    pub fn locales(
        self,
        script: Option<ScriptConversion>,
        direction: Direction,
    ) -> Option<(Locale, Locale)> {
        match self {
            PunctuationPolicy::None => None,
            PunctuationPolicy::Explicit { source, target } => Some((source, target)),
            PunctuationPolicy::Auto => Some(match script {
                Some(conversion) => conversion.locale_pair(),
                None => match direction {
                    Direction::Vertical => (Locale::Hans, Locale::Hant),
                    Direction::Horizontal => (Locale::Hant, Locale::Hant),
                },
            }),
        }
    }
}

impl FromStr for PunctuationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(PunctuationPolicy::Auto),
            "none" => Ok(PunctuationPolicy::None),
            other => split_locale_pair(other)
                .map(|(source, target)| PunctuationPolicy::Explicit { source, target })
                .ok_or_else(|| {
                    Error::InvalidOption(format!(
                        "punctuation must be auto, none or <src>2<dst>, got {other:?}"
                    ))
                }),
        }
    }
}

fn split_locale_pair(code: &str) -> Option<(Locale, Locale)> {
    let (source, target) = code.split_once('2')?;
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((Locale::from_code(source), Locale::from_code(target)))
}

/// Immutable configuration for one run over one or more books.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub direction: Direction,
    pub script: Option<ScriptConversion>,
    pub punctuation: PunctuationPolicy,
    pub ruby: bool,
    pub cantonese: bool,
    /// Print `(` `)` fallbacks around readings for readers without ruby.
    pub ruby_parentheses: bool,
    /// Extra jyutping entries merged over the built-in table.
    pub jyutping_table: Option<PathBuf>,
    /// Directory under which per-book working directories are created.
    pub work_root: PathBuf,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            script: None,
            punctuation: PunctuationPolicy::default(),
            ruby: false,
            cantonese: false,
            ruby_parentheses: true,
            jyutping_table: None,
            work_root: std::env::temp_dir().join("yokotate"),
        }
    }
}

impl TransformConfig {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    pub fn with_script(mut self, script: ScriptConversion) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_punctuation(mut self, policy: PunctuationPolicy) -> Self {
        self.punctuation = policy;
        self
    }

    pub fn with_ruby(mut self, ruby: bool) -> Self {
        self.ruby = ruby;
        self
    }

    pub fn with_cantonese(mut self, cantonese: bool) -> Self {
        self.cantonese = cantonese;
        self
    }

    pub fn with_ruby_parentheses(mut self, show: bool) -> Self {
        self.ruby_parentheses = show;
        self
    }

    pub fn with_jyutping_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.jyutping_table = Some(path.into());
        self
    }

    pub fn with_work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_root = path.into();
        self
    }
}
