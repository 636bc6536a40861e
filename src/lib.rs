//! # yokotate
//!
//! Convert EPUB books between horizontal and vertical writing modes, with
//! optional Chinese script conversion and ruby annotation.
//!
//! ## Features
//!
//! - Vertical (`vertical-rl`, right-to-left spine) and horizontal output
//! - Simplified/Traditional/regional script conversion with matching
//!   quotation marks
//! - Reading glosses in pinyin, jyutping or kana as `<ruby>` markup
//! - Everything else in the book is repacked untouched
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use yokotate::{Direction, EpubProcessor, ScriptConversion, TransformConfig};
//!
//! let config = TransformConfig::new(Direction::Vertical)
//!     .with_script(ScriptConversion::S2t)
//!     .with_ruby(true);
//! let output = EpubProcessor::new(config).run(Path::new("book.epub"), Path::new("out"))?;
//! # Ok::<(), yokotate::Error>(())
//! ```
//!
//! ## Custom stages
//!
//! Stages implement [`convert::Converter`]. Build the default list with
//! [`convert::build_stages`], add or swap entries, and hand it to
//! [`EpubProcessor::run_with`].

pub mod config;
pub mod convert;
pub mod css;
pub mod detect;
pub mod dom;
pub mod epub;
pub mod error;
pub mod pipeline;
pub mod punctuation;
pub mod ruby;
pub mod script;
pub mod util;

pub use config::{Direction, PunctuationPolicy, ScriptConversion, TransformConfig};
pub use error::{Error, Result};
pub use pipeline::{Book, BookOutcome, EpubProcessor, collect_inputs};
