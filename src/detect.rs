//! Coarse CJK language detection by script class.
//!
//! Only used when a book does not declare its language. Counting kana,
//! hangul and Han characters is enough to tell the three apart in running
//! prose, which is all ruby resolution needs.

/// A detected language code: `ja`, `ko` or `zh`.
pub type LanguageCode = &'static str;

/// Share of kana among Han + kana above which text reads as Japanese.
const KANA_RATIO: f64 = 0.05;

pub fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}')
}

pub fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

pub fn is_han(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' | '\u{20000}'..='\u{2FA1F}')
}

/// Detect the language of a run of text, or `None` if it has no CJK
/// characters.
pub fn detect_language(text: &str) -> Option<LanguageCode> {
    let (mut han, mut kana, mut hangul) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        if is_han(c) {
            han += 1;
        } else if is_kana(c) {
            kana += 1;
        } else if is_hangul(c) {
            hangul += 1;
        }
    }

    if han + kana + hangul == 0 {
        return None;
    }
    if kana > 0 && kana as f64 / (han + kana) as f64 >= KANA_RATIO {
        return Some("ja");
    }
    if hangul > han {
        return Some("ko");
    }
    if han > 0 {
        return Some("zh");
    }
    None
}

/// Most frequent vote; ties go to whichever was seen first.
pub fn majority<I>(votes: I) -> Option<LanguageCode>
where
    I: IntoIterator<Item = LanguageCode>,
{
    let mut counts: Vec<(LanguageCode, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(code, _)| *code == vote) {
            Some((_, n)) => *n += 1,
            None => counts.push((vote, 1)),
        }
    }
    // max_by_key keeps the last maximum, so scan in reverse.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scripts() {
        assert_eq!(detect_language("吾輩は猫である。名前はまだ無い。"), Some("ja"));
        assert_eq!(detect_language("我们在这里读书。"), Some("zh"));
        assert_eq!(detect_language("나는 학생입니다"), Some("ko"));
        assert_eq!(detect_language("plain ascii"), None);
    }

    #[test]
    fn test_stray_kana_stays_chinese() {
        let text = "這是一本很長很長的中文書，裡面偶爾出現一個の字，但仍然是中文內容。".repeat(3);
        assert_eq!(detect_language(&text), Some("zh"));
    }

    #[test]
    fn test_majority_vote() {
        assert_eq!(majority(["zh", "ja", "zh"]), Some("zh"));
        assert_eq!(majority(["ja", "zh"]), Some("ja"));
        assert_eq!(majority(Vec::<LanguageCode>::new()), None);
    }
}
