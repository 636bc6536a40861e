//! Chinese script variant conversion.
//!
//! The pipeline only needs text in, text out. [`ZhconvConverter`] backs the
//! identifiers that `zhconv` can express; anything else can be plugged in by
//! implementing [`ScriptConverter`].

use zhconv::{Variant, zhconv};

use crate::config::ScriptConversion;
use crate::error::{Error, Result};

/// Maps text between Chinese script variants.
pub trait ScriptConverter: Send + Sync {
    fn convert(&self, text: &str) -> String;
}

/// Script conversion through the `zhconv` rule sets.
#[derive(Debug, Clone, Copy)]
pub struct ZhconvConverter {
    target: Variant,
}

impl ZhconvConverter {
    /// Build a converter for `conversion`.
    ///
    /// The Japanese shinjitai conversions have no `zhconv` rule set and fail
    /// with [`Error::UnsupportedConversion`].
    pub fn new(conversion: ScriptConversion) -> Result<Self> {
        let target = match conversion {
            ScriptConversion::S2t | ScriptConversion::Hk2t | ScriptConversion::Tw2t => {
                Variant::ZhHant
            }
            ScriptConversion::T2s | ScriptConversion::Hk2s => Variant::ZhHans,
            ScriptConversion::Tw2s | ScriptConversion::Tw2sp => Variant::ZhCN,
            ScriptConversion::S2tw | ScriptConversion::S2twp | ScriptConversion::T2tw => {
                Variant::ZhTW
            }
            ScriptConversion::S2hk | ScriptConversion::T2hk => Variant::ZhHK,
            ScriptConversion::T2jp | ScriptConversion::Jp2t => {
                return Err(Error::UnsupportedConversion(conversion.to_string()));
            }
        };
        Ok(Self { target })
    }
}

impl ScriptConverter for ZhconvConverter {
    fn convert(&self, text: &str) -> String {
        zhconv(text, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplified_to_traditional() {
        let converter = ZhconvConverter::new(ScriptConversion::S2t).unwrap();
        assert_eq!(converter.convert("汉字"), "漢字");
    }

    #[test]
    fn test_traditional_to_simplified() {
        let converter = ZhconvConverter::new(ScriptConversion::T2s).unwrap();
        assert_eq!(converter.convert("漢字"), "汉字");
    }

    #[test]
    fn test_non_chinese_untouched() {
        let converter = ZhconvConverter::new(ScriptConversion::S2tw).unwrap();
        assert_eq!(converter.convert("EPUB 3.0"), "EPUB 3.0");
    }

    #[test]
    fn test_japanese_variants_unsupported() {
        for conversion in [ScriptConversion::T2jp, ScriptConversion::Jp2t] {
            assert!(matches!(
                ZhconvConverter::new(conversion),
                Err(Error::UnsupportedConversion(_))
            ));
        }
    }
}
