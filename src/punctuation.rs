//! Quotation-mark conversion between writing directions and Chinese
//! typographic conventions.
//!
//! Each of the four quote roles has a vertical glyph and a horizontal glyph
//! per locale:
//!
//! | role          | V hant | V hans | H hant | H hans |
//! |---------------|--------|--------|--------|--------|
//! | opening       | ﹁     | ﹃     | 「     | “      |
//! | closing       | ﹂     | ﹄     | 」     | ”      |
//! | opening inner | ﹃     | ﹁     | 『     | ‘      |
//! | closing inner | ﹄     | ﹂     | 』     | ’      |
//!
//! Horizontal glyphs are rendered rotated in vertical mode, so vertical
//! glyphs are only ever rewritten when the target is horizontal.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Typographic convention used to pick quote glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    /// Simplified Chinese.
    Hans,
    /// Traditional Chinese.
    Hant,
}

impl Locale {
    /// Map one side of a conversion code (`s`, `t`, `tw`, `sp`, ...) to a
    /// locale. Only `s` and `sp` are simplified.
    pub fn from_code(code: &str) -> Self {
        match code {
            "s" | "sp" => Locale::Hans,
            _ => Locale::Hant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Hans => "hans",
            Locale::Hant => "hant",
        }
    }
}

/// Glyphs for (opening, closing, opening inner, closing inner).
type QuoteSet = [char; 4];

fn vertical_quotes(locale: Locale) -> QuoteSet {
    match locale {
        Locale::Hant => ['﹁', '﹂', '﹃', '﹄'],
        Locale::Hans => ['﹃', '﹄', '﹁', '﹂'],
    }
}

fn horizontal_quotes(locale: Locale) -> QuoteSet {
    match locale {
        Locale::Hant => ['「', '」', '『', '』'],
        Locale::Hans => ['“', '”', '‘', '’'],
    }
}

/// One substitution pass: a combined pattern over every source glyph and
/// the glyph each one becomes.
struct Pass {
    pattern: Regex,
    table: HashMap<char, char>,
}

impl Pass {
    fn build(horizontal: bool, source: Locale, target: Locale) -> Option<Pass> {
        let mut table = HashMap::new();

        if source != target {
            let from = horizontal_quotes(source);
            let to = horizontal_quotes(target);
            table.extend(from.into_iter().zip(to));
        }

        if horizontal {
            let from = vertical_quotes(source);
            let to = horizontal_quotes(target);
            table.extend(from.into_iter().zip(to));
        }

        if table.is_empty() {
            return None;
        }

        // Sorted so the pattern text is identical from run to run.
        let mut keys: Vec<char> = table.keys().copied().collect();
        keys.sort_unstable();
        let alternation = keys
            .iter()
            .map(|c| regex::escape(&c.to_string()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternation).ok()?;

        Some(Pass { pattern, table })
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let matched = &caps[0];
                matched
                    .chars()
                    .next()
                    .and_then(|c| self.table.get(&c))
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}

static PASSES: Lazy<HashMap<(bool, Locale, Locale), Pass>> = Lazy::new(|| {
    let mut passes = HashMap::new();
    for horizontal in [false, true] {
        for source in [Locale::Hans, Locale::Hant] {
            for target in [Locale::Hans, Locale::Hant] {
                if let Some(pass) = Pass::build(horizontal, source, target) {
                    passes.insert((horizontal, source, target), pass);
                }
            }
        }
    }
    passes
});

/// Convert the quotation marks in `text`.
///
/// When `source != target` the horizontal glyph of each role is swapped for
/// the target locale's glyph. When `horizontal` is set, vertical glyphs are
/// additionally normalized to the target's horizontal glyphs.
pub fn convert(text: &str, horizontal: bool, source: Locale, target: Locale) -> String {
    match PASSES.get(&(horizontal, source, target)) {
        Some(pass) => pass.apply(text),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_GLYPHS: &str = "“A‘B’C”「D『E』F」﹁G﹃H﹄I﹂";

    #[test]
    fn test_map_locale() {
        assert_eq!(Locale::from_code("s"), Locale::Hans);
        assert_eq!(Locale::from_code("sp"), Locale::Hans);
        assert_eq!(Locale::from_code("t"), Locale::Hant);
        assert_eq!(Locale::from_code("tw"), Locale::Hant);
        assert_eq!(Locale::from_code("hk"), Locale::Hant);
        assert_eq!(Locale::from_code("jp"), Locale::Hant);
    }

    #[test]
    fn test_horizontal_golden_table() {
        assert_eq!(
            convert(ALL_GLYPHS, true, Locale::Hans, Locale::Hans),
            "“A‘B’C”「D『E』F」‘G“H”I’"
        );
        assert_eq!(
            convert(ALL_GLYPHS, true, Locale::Hant, Locale::Hant),
            "“A‘B’C”「D『E』F」「G『H』I」"
        );
        assert_eq!(
            convert(ALL_GLYPHS, true, Locale::Hans, Locale::Hant),
            "「A『B』C」「D『E』F」『G「H」I』"
        );
        assert_eq!(
            convert(ALL_GLYPHS, true, Locale::Hant, Locale::Hans),
            "“A‘B’C”“D‘E’F”“G‘H’I”"
        );
    }

    #[test]
    fn test_horizontal_swap_round_trip() {
        let simplified = "他说“我读过‘论语’了”";
        let traditional = convert(simplified, true, Locale::Hans, Locale::Hant);
        assert_eq!(traditional, "他说「我读过『论语』了」");
        assert_eq!(
            convert(&traditional, true, Locale::Hant, Locale::Hans),
            simplified
        );

        let traditional = "他說「我讀過『論語』了」";
        let simplified = convert(traditional, true, Locale::Hant, Locale::Hans);
        assert_eq!(simplified, "他說“我讀過‘論語’了”");
        assert_eq!(
            convert(&simplified, true, Locale::Hans, Locale::Hant),
            traditional
        );
    }

    #[test]
    fn test_vertical_keeps_vertical_glyphs() {
        // Same locale in vertical mode is a no-op.
        assert_eq!(convert(ALL_GLYPHS, false, Locale::Hant, Locale::Hant), ALL_GLYPHS);
        assert_eq!(
            convert(ALL_GLYPHS, false, Locale::Hans, Locale::Hant),
            "「A『B』C」「D『E』F」﹁G﹃H﹄I﹂"
        );
    }

    #[test]
    fn test_substitution_is_single_pass() {
        // “ becomes 「 but the fresh 「 must not be mapped again.
        assert_eq!(convert("“", false, Locale::Hans, Locale::Hant), "「");
        assert_eq!(convert("「", false, Locale::Hant, Locale::Hans), "“");
    }

    proptest! {
        #[test]
        fn prop_text_without_quotes_is_unchanged(s in "[a-z0-9 一-龥，。]{0,40}") {
            for horizontal in [false, true] {
                for source in [Locale::Hans, Locale::Hant] {
                    for target in [Locale::Hans, Locale::Hant] {
                        prop_assert_eq!(convert(&s, horizontal, source, target), s.clone());
                    }
                }
            }
        }

        #[test]
        fn prop_conversion_is_deterministic(s in "[“”‘’「」『』﹁﹂﹃﹄a-z]{0,30}") {
            let first = convert(&s, true, Locale::Hans, Locale::Hant);
            let second = convert(&s, true, Locale::Hans, Locale::Hant);
            prop_assert_eq!(first.chars().count(), s.chars().count());
            prop_assert_eq!(first, second);
        }
    }
}
