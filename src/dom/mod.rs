//! Content document parsing and XHTML serialization.
//!
//! Content documents are parsed leniently with html5ever into an arena
//! [`Dom`], mutated by the stages, and written back as XHTML so a strict
//! XML reader can still open them.

mod arena;
mod tree_sink;

pub use arena::{Attribute, ChildrenIter, Dom, Node, NodeData, NodeId};
pub use tree_sink::{DomSink, NodeHandle};

use std::fmt::Write;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{QualName, ns};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements laid out one child per line in pretty mode, provided every
/// child is itself one of these or a head element.
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "head", "body", "div", "section", "article", "nav", "aside", "header", "footer",
    "main", "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr", "figure", "blockquote",
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "dt", "dd", "pre", "hr", "figcaption",
    "td", "th", "caption", "colgroup", "col",
];

const HEAD_ELEMENTS: &[&str] = &["title", "meta", "link", "style", "script", "base"];

static SELF_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9:_-]*)((?:\s[^<>]*?)?)\s*/>").expect("static pattern")
});

/// Comments, CDATA sections and the bodies of `script`/`style` elements.
/// A self-closed `<script/>` does not open a region.
static RAW_REGIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)<!--.*?-->|<!\[CDATA\[.*?\]\]>",
        r"|<script\b(?:[^>]*[^/>])?>.*?</script\s*>",
        r"|<style\b(?:[^>]*[^/>])?>.*?</style\s*>",
    ))
    .expect("static pattern")
});

/// Rewrite `<tag/>` into `<tag></tag>` for every non-void element.
///
/// The HTML tree builder ignores the self-closing flag on normal elements,
/// so an XHTML `<title/>` or `<div/>` would otherwise swallow the rest of
/// the document. Comments and raw text are copied as they are.
pub fn expand_self_closing(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for region in RAW_REGIONS.find_iter(html) {
        out.push_str(&expand_tags(&html[last..region.start()]));
        out.push_str(region.as_str());
        last = region.end();
    }
    out.push_str(&expand_tags(&html[last..]));
    out
}

fn expand_tags(markup: &str) -> std::borrow::Cow<'_, str> {
    SELF_CLOSING.replace_all(markup, |caps: &Captures<'_>| {
        let tag = &caps[1];
        if VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str()) {
            caps[0].to_string()
        } else {
            format!("<{}{}></{}>", tag, &caps[2], tag)
        }
    })
}

/// Parse a content document.
///
/// Scripting is off so `<noscript>` content is parsed as markup rather
/// than as one text node.
pub fn parse(html: &str) -> Dom {
    let expanded = expand_self_closing(html);
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = parse_document(DomSink::new(), opts)
        .from_utf8()
        .one(expanded.as_bytes());
    result.into_dom()
}

/// Serialize a document back to XHTML.
///
/// With `pretty` set, pure block containers put each child on its own
/// indented line. Mixed or inline content is never re-flowed, so running the
/// printer over its own output gives the same text.
pub fn serialize(dom: &Dom, pretty: bool) -> String {
    let mut writer = XhtmlWriter {
        dom,
        pretty,
        out: String::new(),
    };
    writer.write_document();
    writer.out
}

struct XhtmlWriter<'a> {
    dom: &'a Dom,
    pretty: bool,
    out: String,
}

impl XhtmlWriter<'_> {
    fn write_document(&mut self) {
        // No newline after the root element: the tree builder would move it
        // into <body> on the next parse.
        let children: Vec<NodeId> = self.dom.children(self.dom.document()).collect();
        let mut first = true;
        for child in children {
            let Some(node) = self.dom.get(child) else {
                continue;
            };
            if matches!(&node.data, NodeData::Text(text) if text.trim().is_empty()) {
                continue;
            }
            if !first {
                self.out.push('\n');
            }
            first = false;
            match &node.data {
                NodeData::Doctype {
                    name,
                    public_id,
                    system_id,
                } => {
                    self.out.push_str("<!DOCTYPE ");
                    self.out.push_str(name);
                    if !public_id.is_empty() {
                        let _ = write!(self.out, " PUBLIC \"{public_id}\"");
                        if !system_id.is_empty() {
                            let _ = write!(self.out, " \"{system_id}\"");
                        }
                    } else if !system_id.is_empty() {
                        let _ = write!(self.out, " SYSTEM \"{system_id}\"");
                    }
                    self.out.push('>');
                }
                _ => self.write_node(child, 0),
            }
        }
    }

    fn write_node(&mut self, id: NodeId, depth: usize) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document | NodeData::Doctype { .. } => {}
            NodeData::Text(text) => {
                let raw = self
                    .dom
                    .element_name(node.parent)
                    .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name.as_ref()));
                if raw {
                    self.out.push_str(text);
                } else {
                    escape_text(&mut self.out, text);
                }
            }
            NodeData::Comment(text) => {
                if text.starts_with('?') {
                    // Processing instruction, typically the XML declaration.
                    let _ = write!(self.out, "<{text}>");
                } else {
                    let _ = write!(self.out, "<!--{text}-->");
                }
            }
            NodeData::Element { name, attrs } => self.write_element(id, name, attrs, depth),
        }
    }

    fn write_element(&mut self, id: NodeId, name: &QualName, attrs: &[Attribute], depth: usize) {
        let tag = name.local.as_ref();
        self.out.push('<');
        self.out.push_str(tag);
        for attr in attrs {
            self.out.push(' ');
            if let Some(prefix) = &attr.name.prefix {
                self.out.push_str(prefix);
                self.out.push(':');
            }
            self.out.push_str(&attr.name.local);
            self.out.push_str("=\"");
            escape_attr(&mut self.out, &attr.value);
            self.out.push('"');
        }

        let children: Vec<NodeId> = self.dom.children(id).collect();
        let is_html = name.ns == ns!(html);
        if (is_html && VOID_ELEMENTS.contains(&tag)) || (!is_html && children.is_empty()) {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        if self.pretty && is_html && self.is_block_container(tag, &children) {
            let mut wrote_child = false;
            for child in children {
                if self.is_blank_text(child) {
                    continue;
                }
                self.out.push('\n');
                push_indent(&mut self.out, depth + 1);
                self.write_node(child, depth + 1);
                wrote_child = true;
            }
            if wrote_child {
                self.out.push('\n');
                push_indent(&mut self.out, depth);
            }
        } else {
            for child in children {
                self.write_node(child, depth + 1);
            }
        }

        let _ = write!(self.out, "</{tag}>");
    }

    fn is_block_container(&self, tag: &str, children: &[NodeId]) -> bool {
        if !BLOCK_ELEMENTS.contains(&tag) || RAW_TEXT_ELEMENTS.contains(&tag) || tag == "pre" {
            return false;
        }
        children.iter().all(|&child| {
            if self.is_blank_text(child) {
                return true;
            }
            match self.dom.get(child).map(|n| &n.data) {
                Some(NodeData::Comment(_)) => true,
                Some(NodeData::Element { name, .. }) => {
                    let local = name.local.as_ref();
                    BLOCK_ELEMENTS.contains(&local) || HEAD_ELEMENTS.contains(&local)
                }
                _ => false,
            }
        })
    }

    fn is_blank_text(&self, id: NodeId) -> bool {
        self.dom.text_content(id).is_some_and(|t| t.trim().is_empty())
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="zh">
<head>
<title/>
<link href="../Style/a.css" rel="stylesheet" type="text/css"/>
</head>
<body>
<p>你好 &amp; <b>世界</b><br/></p>
<script>if (a < b) {}</script>
</body>
</html>"#;

    #[test]
    fn test_expand_self_closing() {
        assert_eq!(expand_self_closing("<title/>"), "<title></title>");
        assert_eq!(
            expand_self_closing(r#"<div class="x" />"#),
            r#"<div class="x"></div>"#
        );
        assert_eq!(expand_self_closing("<br/>"), "<br/>");
        assert_eq!(expand_self_closing(r#"<img src="a.png"/>"#), r#"<img src="a.png"/>"#);
    }

    #[test]
    fn test_expand_skips_comments_and_raw_text() {
        assert_eq!(
            expand_self_closing(r#"<script>var s = "<b/>";</script><!-- <i/> --><div/>"#),
            r#"<script>var s = "<b/>";</script><!-- <i/> --><div></div>"#
        );
        assert_eq!(
            expand_self_closing(r#"<script src="a.js"/><p/><style>a::after{content:"<x/>"}</style>"#),
            r#"<script src="a.js"></script><p></p><style>a::after{content:"<x/>"}</style>"#
        );
    }

    #[test]
    fn test_script_text_survives_round_trip() {
        let out = serialize(
            &parse(r#"<html><body><script>document.write("<b/>");</script><p/></body></html>"#),
            false,
        );
        assert!(out.contains(r#"<script>document.write("<b/>");</script><p></p>"#));
    }

    #[test]
    fn test_noscript_content_stays_markup() {
        let html = "<html><body><noscript><p>x</p></noscript><p>y</p></body></html>";
        let out = serialize(&parse(html), false);
        assert!(out.contains("<body><noscript><p>x</p></noscript><p>y</p></body>"));
        assert_eq!(serialize(&parse(&out), false), out);
    }

    #[test]
    fn test_self_closing_title_does_not_swallow_body() {
        let dom = parse(CHAPTER);
        let p = dom.find_by_tag("p").expect("p survives");
        assert_eq!(dom.collect_text(p), "你好 & 世界");
    }

    #[test]
    fn test_serialize_keeps_declaration_and_doctype() {
        let out = serialize(&parse(CHAPTER), false);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n<html"));
        assert!(out.contains(r#"xml:lang="zh""#));
        assert!(out.contains("<br/>"));
        assert!(out.contains("你好 &amp; <b>世界</b>"));
        assert!(out.contains("if (a < b) {}"));
        assert!(out.contains(r#"<link href="../Style/a.css" rel="stylesheet" type="text/css"/>"#));
    }

    #[test]
    fn test_serialize_is_stable() {
        for pretty in [false, true] {
            let once = serialize(&parse(CHAPTER), pretty);
            let twice = serialize(&parse(&once), pretty);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_pretty_indents_blocks_only() {
        let out = serialize(&parse("<html><head><title>t</title></head><body><div><p>a <i>b</i></p></div></body></html>"), true);
        assert!(out.contains("\n  <head>\n    <title>t</title>\n  </head>"));
        assert!(out.contains("\n    <div>\n      <p>a <i>b</i></p>\n    </div>"));
    }

    #[test]
    fn test_svg_children_self_close() {
        let out = serialize(
            &parse(r#"<html><body><svg viewBox="0 0 1 1"><rect width="1"/></svg></body></html>"#),
            false,
        );
        assert!(out.contains(r#"<svg viewBox="0 0 1 1"><rect width="1"/></svg>"#));
    }
}
