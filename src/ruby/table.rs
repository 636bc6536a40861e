//! Word to reading tables for lookup-based segmenters.

use std::collections::HashMap;

const JYUTPING: &str = include_str!("data/jyutping.tsv");
const KANA: &str = include_str!("data/kana.tsv");

/// Word and character to reading mapping.
///
/// Lines are `entry<TAB>reading`; blank lines and `#` comments are skipped.
#[derive(Debug, Clone, Default)]
pub struct ReadingTable {
    entries: HashMap<String, String>,
    /// Longest entry, in characters.
    longest: usize,
}

impl ReadingTable {
    /// Cantonese jyutping shipped with the crate.
    pub fn jyutping() -> Self {
        Self::from_tsv(JYUTPING)
    }

    /// Japanese hiragana readings shipped with the crate.
    pub fn kana() -> Self {
        Self::from_tsv(KANA)
    }

    pub fn from_tsv(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((entry, reading)) = line.split_once('\t') else {
                log::debug!("skipping reading table line without a tab: {line:?}");
                continue;
            };
            table.insert(entry.trim(), reading.trim());
        }
        table
    }

    pub fn insert(&mut self, entry: &str, reading: &str) {
        if entry.is_empty() || reading.is_empty() {
            return;
        }
        self.longest = self.longest.max(entry.chars().count());
        self.entries.insert(entry.to_string(), reading.to_string());
    }

    /// Merge `other` over this table; its entries win.
    pub fn merge(&mut self, other: ReadingTable) {
        self.longest = self.longest.max(other.longest);
        self.entries.extend(other.entries);
    }

    pub fn get(&self, entry: &str) -> Option<&str> {
        self.entries.get(entry).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split `text` by greedy longest match. Matched words carry their
    /// reading; the runs between them carry `None`.
    pub fn split<'a, 't>(&'a self, text: &'t str) -> Vec<(&'t str, Option<&'a str>)> {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars = bounds.len() - 1;

        let mut pieces = Vec::new();
        let mut unmatched_from = 0;
        let mut i = 0;
        while i < chars {
            let max = self.longest.min(chars - i);
            let found = (1..=max).rev().find_map(|len| {
                let word = &text[bounds[i]..bounds[i + len]];
                self.get(word).map(|reading| (len, word, reading))
            });
            let Some((len, word, reading)) = found else {
                i += 1;
                continue;
            };
            if unmatched_from < bounds[i] {
                pieces.push((&text[unmatched_from..bounds[i]], None));
            }
            pieces.push((word, Some(reading)));
            i += len;
            unmatched_from = bounds[i];
        }
        if unmatched_from < text.len() {
            pieces.push((&text[unmatched_from..], None));
        }
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_load() {
        let jyutping = ReadingTable::jyutping();
        assert!(jyutping.len() > 100);
        assert_eq!(jyutping.get("我"), Some("ngo5"));
        assert_eq!(jyutping.get("唔該"), Some("m4 goi1"));

        let kana = ReadingTable::kana();
        assert!(kana.len() > 100);
        assert_eq!(kana.get("日本語"), Some("にほんご"));
        assert_eq!(kana.get("漢字"), Some("かんじ"));
    }

    #[test]
    fn test_split_prefers_longest() {
        let table = ReadingTable::from_tsv("# test\n日\tひ\n日本\tにほん\n日本語\tにほんご\n");
        assert_eq!(
            table.split("a日本語と日b"),
            vec![
                ("a", None),
                ("日本語", Some("にほんご")),
                ("と", None),
                ("日", Some("ひ")),
                ("b", None),
            ]
        );
        assert!(table.split("").is_empty());
    }

    #[test]
    fn test_merge_overrides() {
        let mut table = ReadingTable::jyutping();
        table.merge(ReadingTable::from_tsv(
            "我\tngo4\nno tab here\n靚仔靚女\tleng3 zai2 leng3 neoi5\n",
        ));
        assert_eq!(table.get("我"), Some("ngo4"));
        assert_eq!(table.split("靚仔靚女"), vec![("靚仔靚女", Some("leng3 zai2 leng3 neoi5"))]);
    }
}
