//! Small helpers shared by the pipeline and the stages.

use std::borrow::Cow;
use std::path::{Component, Path};

use sha2::{Digest, Sha256};

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract encoding from an XML declaration in the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Read a text document from disk, tolerating legacy encodings.
pub fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let hint = extract_xml_encoding(&bytes);
    Ok(decode_text(&bytes, hint).into_owned())
}

/// Rewrite the `encoding` of an XML declaration to UTF-8, since documents
/// are always written back as UTF-8.
pub fn force_utf8_declaration(text: &str) -> Cow<'_, str> {
    let Some(rest) = text.strip_prefix("<?xml") else {
        return Cow::Borrowed(text);
    };
    let Some(end) = rest.find("?>") else {
        return Cow::Borrowed(text);
    };
    let decl = &rest[..end];
    let Some(enc_pos) = decl.to_ascii_lowercase().find("encoding=") else {
        return Cow::Borrowed(text);
    };
    let value = &decl[enc_pos + 9..];
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Cow::Borrowed(text);
    };
    let Some(close) = value[1..].find(quote) else {
        return Cow::Borrowed(text);
    };
    if value[1..=close].eq_ignore_ascii_case("utf-8") {
        return Cow::Borrowed(text);
    }

    let value_start = 5 + enc_pos + 9;
    let value_end = value_start + close + 2;
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..value_start]);
    out.push_str("\"UTF-8\"");
    out.push_str(&text[value_end..]);
    Cow::Owned(out)
}

/// Hex SHA-256 digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Book name used for working directories and output files: the file name
/// up to its first dot.
pub fn book_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split('.').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => file_name,
    }
}

/// Relative URL from a document in `from_dir` to the file at `to`.
///
/// Both paths must be absolute (or share the same base). Components are
/// joined with `/` regardless of platform.
pub fn relative_href(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let target: Vec<Component<'_>> = to
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("縦書き".as_bytes(), None), "縦書き");
    }

    #[test]
    fn test_decode_with_hint() {
        // "中" in GBK
        let bytes = [0xD6, 0xD0];
        assert_eq!(decode_text(&bytes, Some("gbk")), "中");
    }

    #[test]
    fn test_extract_xml_encoding() {
        let doc = br#"<?xml version="1.0" encoding="GBK"?><html/>"#;
        assert_eq!(extract_xml_encoding(doc), Some("GBK"));
        assert_eq!(extract_xml_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_force_utf8_declaration() {
        assert_eq!(
            force_utf8_declaration(r#"<?xml version="1.0" encoding="GBK"?><p/>"#),
            r#"<?xml version="1.0" encoding="UTF-8"?><p/>"#
        );
        let already = r#"<?xml version="1.0" encoding="utf-8"?><p/>"#;
        assert_eq!(force_utf8_declaration(already), already);
        assert_eq!(force_utf8_declaration("<p/>"), "<p/>");
    }

    #[test]
    fn test_book_name() {
        assert_eq!(book_name(Path::new("/books/animal_farm.epub")), "animal_farm");
        assert_eq!(book_name(Path::new("lemo.v2.epub")), "lemo");
    }

    #[test]
    fn test_relative_href() {
        let opf_dir = PathBuf::from("/work/book/OEBPS");
        let css = opf_dir.join("Style/style.css");
        assert_eq!(relative_href(&opf_dir.join("Text"), &css), "../Style/style.css");
        assert_eq!(relative_href(&opf_dir, &css), "Style/style.css");
        assert_eq!(
            relative_href(Path::new("/work/book/OEBPS/a/b"), &css),
            "../../Style/style.css"
        );
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
