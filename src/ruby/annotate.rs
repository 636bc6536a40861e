use crate::dom::{Dom, NodeData, NodeId};
use crate::error::Result;

use super::{Segmenter, TextSegment};

/// Elements whose text is never annotated: existing ruby markup and raw
/// text containers.
const SKIP_ELEMENTS: &[&str] = &["ruby", "rt", "rp", "script", "style", "template"];

/// Split a shared trailing run off an annotated segment.
///
/// `送り` read `おくり` becomes `送` read `おく` followed by plain `り`. A
/// segment whose reading equals its surface becomes plain; one whose shared
/// suffix covers the whole of either side stays annotated as a whole.
pub fn trim_shared_suffix(segment: TextSegment) -> Vec<TextSegment> {
    let Some(reading) = segment.reading.as_deref() else {
        return vec![segment];
    };
    if segment.surface == reading {
        return vec![TextSegment::plain(segment.surface)];
    }
    if segment.is_english_hint {
        return vec![segment];
    }

    let shared = segment
        .surface
        .chars()
        .rev()
        .zip(reading.chars().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let shorter = segment.surface.chars().count().min(reading.chars().count());
    if shared == 0 || shared >= shorter {
        return vec![segment];
    }

    let split_surface = char_boundary_from_end(&segment.surface, shared);
    let split_reading = char_boundary_from_end(reading, shared);
    vec![
        TextSegment::annotated(&segment.surface[..split_surface], &reading[..split_reading]),
        TextSegment::plain(&segment.surface[split_surface..]),
    ]
}

fn char_boundary_from_end(s: &str, chars: usize) -> usize {
    s.char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Annotate every text node under `root`. Returns the number of `<ruby>`
/// elements created.
///
/// Text nodes are collected first and rewritten afterwards, so replacing a
/// node never disturbs the walk.
pub fn annotate(
    dom: &mut Dom,
    root: NodeId,
    segmenter: &dyn Segmenter,
    parentheses: bool,
) -> Result<usize> {
    let mut targets = Vec::new();
    collect_text_nodes(dom, root, &mut targets);

    let mut created = 0;
    for id in targets {
        let Some(text) = dom.text_content(id).map(str::to_string) else {
            continue;
        };
        let segments = segment_text(&text, segmenter)?;
        if segments.iter().all(TextSegment::is_plain) {
            continue;
        }
        let (nodes, rubies) = build_nodes(dom, segments, parentheses);
        dom.replace_with(id, &nodes);
        created += rubies;
    }
    Ok(created)
}

fn collect_text_nodes(dom: &Dom, parent: NodeId, out: &mut Vec<NodeId>) {
    for child in dom.children(parent) {
        match dom.get(child).map(|n| &n.data) {
            Some(NodeData::Text(text)) if !text.trim().is_empty() => out.push(child),
            Some(NodeData::Element { name, .. }) if !SKIP_ELEMENTS.contains(&name.local.as_ref()) => {
                collect_text_nodes(dom, child, out)
            }
            _ => {}
        }
    }
}

/// Segment a text node, keeping whitespace runs as literal plain text.
fn segment_text(text: &str, segmenter: &dyn Segmenter) -> Result<Vec<TextSegment>> {
    let mut segments = Vec::new();
    for (is_space, run) in whitespace_runs(text) {
        if is_space {
            segments.push(TextSegment::plain(run));
            continue;
        }
        for segment in segmenter.segment(run)? {
            if segment.surface.is_empty() {
                continue;
            }
            segments.extend(trim_shared_suffix(segment));
        }
    }
    Ok(segments)
}

fn whitespace_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        match current {
            Some(kind) if kind == is_space => {}
            Some(kind) => {
                runs.push((kind, &text[start..i]));
                start = i;
                current = Some(is_space);
            }
            None => current = Some(is_space),
        }
    }
    if let Some(kind) = current {
        runs.push((kind, &text[start..]));
    }
    runs
}

/// Turn segments into DOM nodes: plain runs merge into one text node,
/// annotated runs share one `<ruby>`.
fn build_nodes(dom: &mut Dom, segments: Vec<TextSegment>, parentheses: bool) -> (Vec<NodeId>, usize) {
    let mut nodes = Vec::new();
    let mut rubies = 0;
    let mut plain = String::new();
    let mut ruby: Option<NodeId> = None;

    for segment in segments {
        match segment.reading {
            None => {
                ruby = None;
                plain.push_str(&segment.surface);
            }
            Some(reading) => {
                if !plain.is_empty() {
                    nodes.push(dom.create_text(std::mem::take(&mut plain)));
                }
                let group = match ruby {
                    Some(group) => group,
                    None => {
                        let group = dom.create_html_element("ruby", &[]);
                        nodes.push(group);
                        rubies += 1;
                        ruby = Some(group);
                        group
                    }
                };
                dom.append_text(group, &segment.surface);
                if parentheses {
                    append_wrapped(dom, group, "rp", "(");
                }
                append_wrapped(dom, group, "rt", &reading);
                if parentheses {
                    append_wrapped(dom, group, "rp", ")");
                }
            }
        }
    }
    if !plain.is_empty() {
        nodes.push(dom.create_text(plain));
    }
    (nodes, rubies)
}

fn append_wrapped(dom: &mut Dom, parent: NodeId, tag: &str, text: &str) {
    let element = dom.create_html_element(tag, &[]);
    let text = dom.create_text(text.to_string());
    dom.append(element, text);
    dom.append(parent, element);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    /// Reads every character as itself in brackets, except `の`.
    struct Bracketing;

    impl Segmenter for Bracketing {
        fn segment(&self, text: &str) -> Result<Vec<TextSegment>> {
            Ok(text
                .chars()
                .map(|c| match c {
                    'の' | '.' => TextSegment::plain(c.to_string()),
                    c => TextSegment::annotated(c.to_string(), format!("[{c}]")),
                })
                .collect())
        }
    }

    fn run(html: &str, parentheses: bool) -> (String, usize) {
        let mut dom = dom::parse(html);
        let body = dom.find_by_tag("body").unwrap();
        let n = annotate(&mut dom, body, &Bracketing, parentheses).unwrap();
        let out = dom::serialize(&dom, false);
        let start = out.find("<body>").unwrap();
        let end = out.find("</body>").unwrap();
        (out[start + 6..end].to_string(), n)
    }

    #[test]
    fn test_trim_shared_suffix() {
        assert_eq!(
            trim_shared_suffix(TextSegment::annotated("送り", "おくり")),
            vec![TextSegment::annotated("送", "おく"), TextSegment::plain("り")]
        );
        assert_eq!(
            trim_shared_suffix(TextSegment::annotated("漢字", "かんじ")),
            vec![TextSegment::annotated("漢字", "かんじ")]
        );
        assert_eq!(
            trim_shared_suffix(TextSegment::annotated("ね", "ね")),
            vec![TextSegment::plain("ね")]
        );
        // Suffix covers the whole surface: keep the token annotated.
        assert_eq!(
            trim_shared_suffix(TextSegment::annotated("り", "おくり")),
            vec![TextSegment::annotated("り", "おくり")]
        );
        assert_eq!(
            trim_shared_suffix(TextSegment::plain("abc")),
            vec![TextSegment::plain("abc")]
        );
    }

    #[test]
    fn test_groups_and_parentheses() {
        let (body, n) = run("<html><body><p>甲乙の丙</p></body></html>", true);
        assert_eq!(n, 2);
        assert_eq!(
            body,
            "<p><ruby>甲<rp>(</rp><rt>[甲]</rt><rp>)</rp>乙<rp>(</rp><rt>[乙]</rt><rp>)</rp></ruby>の<ruby>丙<rp>(</rp><rt>[丙]</rt><rp>)</rp></ruby></p>"
        );
    }

    #[test]
    fn test_whitespace_preserved_without_parentheses() {
        let (body, _) = run("<html><body><p>甲  乙</p></body></html>", false);
        assert_eq!(
            body,
            "<p><ruby>甲<rt>[甲]</rt></ruby>  <ruby>乙<rt>[乙]</rt></ruby></p>"
        );
    }

    #[test]
    fn test_existing_ruby_and_scripts_skipped() {
        let html = "<html><body><p><ruby>甲<rt>x</rt></ruby></p><script>乙</script></body></html>";
        let (body, n) = run(html, true);
        assert_eq!(n, 0);
        assert_eq!(body, "<p><ruby>甲<rt>x</rt></ruby></p><script>乙</script>");
    }

    #[test]
    fn test_nested_inline_elements() {
        let (body, n) = run("<html><body><p>の<b>甲</b>.</p></body></html>", true);
        assert_eq!(n, 1);
        assert_eq!(
            body,
            "<p>の<b><ruby>甲<rp>(</rp><rt>[甲]</rt><rp>)</rp></ruby></b>.</p>"
        );
    }
}
