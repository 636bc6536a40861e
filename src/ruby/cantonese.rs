//! Cantonese readings from a jyutping lookup table.

use super::{ReadingTable, Segmenter, TextSegment};
use crate::error::Result;

/// Cantonese segmenter: greedy longest match against a jyutping
/// [`ReadingTable`].
///
/// Mapped words are read as `jyutping, `; unmapped text passes through.
#[derive(Debug, Clone)]
pub struct CantoneseSegmenter {
    table: ReadingTable,
}

impl CantoneseSegmenter {
    pub fn new(table: ReadingTable) -> Self {
        Self { table }
    }
}

impl Segmenter for CantoneseSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<TextSegment>> {
        Ok(self
            .table
            .split(text)
            .into_iter()
            .map(|(word, reading)| match reading {
                Some(reading) => TextSegment::annotated(word, format!("{reading}, ")),
                None => TextSegment::plain(word),
            })
            .collect())
    }
}
