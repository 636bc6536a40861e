use std::fs;
use std::path::{Path, PathBuf};

use super::{Converter, StageConfig};
use crate::config::Direction;
use crate::css::{Rule, StyleRule, Stylesheet};
use crate::dom::{self, Dom, NodeId};
use crate::epub::PackageDocument;
use crate::error::Result;
use crate::util;

/// Properties that set the writing mode, in the order they are written.
const WRITING_MODE_PROPERTIES: [&str; 3] =
    ["-epub-writing-mode", "writing-mode", "-webkit-writing-mode"];

/// Where a synthesized stylesheet goes, relative to the package document.
const SYNTHESIZED_HREF: &str = "Style/style.css";

/// Switches a book to vertical or horizontal presentation.
///
/// The vertical pass adds `vertical-rl` to the root rule and, for books
/// without a stylesheet, writes and links one. The horizontal pass strips
/// the writing-mode properties. Both set the spine progression and the
/// `primary-writing-mode` meta.
#[derive(Debug)]
pub struct DirectionConverter {
    direction: Direction,
    /// Absolute path of the stylesheet written by `handle_missing_css`.
    synthesized: Option<PathBuf>,
}

impl DirectionConverter {
    pub fn vertical() -> Self {
        Self {
            direction: Direction::Vertical,
            synthesized: None,
        }
    }

    pub fn horizontal() -> Self {
        Self {
            direction: Direction::Horizontal,
            synthesized: None,
        }
    }

    /// The stylesheet this stage wrote, if any.
    pub fn synthesized_stylesheet(&self) -> Option<&Path> {
        self.synthesized.as_deref()
    }
}

fn is_root_rule(rule: &StyleRule) -> bool {
    rule.selector.trim().eq_ignore_ascii_case("html")
}

fn vertical_root_rule() -> StyleRule {
    let mut rule = StyleRule::new("html");
    for property in WRITING_MODE_PROPERTIES {
        rule.push_declaration(property, Direction::Vertical.writing_mode());
    }
    rule
}

fn add_vertical(stylesheet: &mut Stylesheet) {
    let mut found = false;
    for rule in stylesheet.style_rules_mut().filter(|r| is_root_rule(r)) {
        found = true;
        for property in WRITING_MODE_PROPERTIES {
            if !rule.has_property(property) {
                rule.push_declaration(property, Direction::Vertical.writing_mode());
            }
        }
    }
    if !found {
        stylesheet.push_rule(vertical_root_rule());
    }
}

fn strip_writing_mode(stylesheet: &mut Stylesheet) {
    stylesheet.rules.retain_mut(|rule| {
        let Rule::Style(style) = rule else {
            return true;
        };
        let removed: usize = WRITING_MODE_PROPERTIES
            .iter()
            .map(|property| style.remove_property(property))
            .sum();
        // Drop rules that held nothing but the writing mode.
        removed == 0 || !style.is_empty()
    });
}

/// Add `<link rel="stylesheet">` to the document head unless an identical
/// link is already there. Returns whether the document changed.
fn link_stylesheet(dom: &mut Dom, href: &str) -> bool {
    let head = find_or_create_head(dom);
    let linked = dom.children(head).any(|child| {
        dom.is_element_named(child, "link") && dom.get_attr(child, "href") == Some(href)
    });
    if linked {
        return false;
    }
    let link = dom.create_html_element(
        "link",
        &[("rel", "stylesheet"), ("href", href), ("type", "text/css")],
    );
    dom.append(head, link);
    true
}

fn find_or_create_head(dom: &mut Dom) -> NodeId {
    if let Some(head) = dom.find_by_tag("head") {
        return head;
    }
    let head = dom.create_html_element("head", &[]);
    match dom.find_by_tag("html") {
        Some(html) => dom.prepend(html, head),
        None => {
            let document = dom.document();
            dom.prepend(document, head);
        }
    }
    head
}

impl Converter for DirectionConverter {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Vertical => "vertical",
            Direction::Horizontal => "horizontal",
        }
    }

    fn receive_config(&mut self, _config: &StageConfig) -> Result<()> {
        self.synthesized = None;
        Ok(())
    }

    fn process_css(&mut self, stylesheet: &mut Stylesheet) -> Result<()> {
        match self.direction {
            Direction::Vertical => add_vertical(stylesheet),
            Direction::Horizontal => strip_writing_mode(stylesheet),
        }
        Ok(())
    }

    fn handle_missing_css(&mut self, opf_dir: &Path) -> Result<()> {
        if self.direction == Direction::Horizontal {
            return Ok(());
        }
        let path = opf_dir.join(SYNTHESIZED_HREF);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut stylesheet = Stylesheet::default();
        stylesheet.push_rule(vertical_root_rule());
        fs::write(&path, format!("@charset \"utf-8\";\n{}", stylesheet.to_css()))?;
        log::debug!("wrote stylesheet {}", path.display());
        self.synthesized = Some(path);
        Ok(())
    }

    fn process_opf(&mut self, opf: &mut PackageDocument) -> Result<()> {
        if opf.set_spine_direction(self.direction.progression())? {
            log::debug!("spine progression set to {}", self.direction.progression());
        }
        opf.set_writing_mode(self.direction.writing_mode())?;
        if self.synthesized.is_some() {
            let id = opf.add_manifest_item("stylesheet", SYNTHESIZED_HREF, "text/css")?;
            log::debug!("manifest item {id} -> {SYNTHESIZED_HREF}");
        }
        Ok(())
    }

    fn process_content(&mut self, html: &str, path: &Path) -> Result<String> {
        let Some(stylesheet) = &self.synthesized else {
            return Ok(html.to_string());
        };
        let content_dir = path.parent().unwrap_or(Path::new(""));
        let href = util::relative_href(content_dir, stylesheet);

        let mut document = dom::parse(html);
        if !link_stylesheet(&mut document, &href) {
            return Ok(html.to_string());
        }
        Ok(dom::serialize(&document, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:language>zh</dc:language>
  </metadata>
  <manifest>
    <item id="c1" href="Text/c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
  </spine>
</package>"#;

    fn css(stage: &mut DirectionConverter, input: &str) -> String {
        let mut sheet = Stylesheet::parse(input).unwrap();
        stage.process_css(&mut sheet).unwrap();
        sheet.to_css()
    }

    #[test]
    fn test_vertical_appends_root_rule() {
        let out = css(&mut DirectionConverter::vertical(), "p { margin: 0; }");
        assert!(out.contains("p {\n  margin: 0;\n}"));
        assert!(out.contains(
            "html {\n  -epub-writing-mode: vertical-rl;\n  writing-mode: vertical-rl;\n  -webkit-writing-mode: vertical-rl;\n}"
        ));
    }

    #[test]
    fn test_vertical_never_overwrites() {
        let out = css(
            &mut DirectionConverter::vertical(),
            "html { writing-mode: horizontal-tb; color: red; }",
        );
        assert!(out.contains("writing-mode: horizontal-tb;"));
        assert!(out.contains("-epub-writing-mode: vertical-rl;"));
        assert!(out.contains("-webkit-writing-mode: vertical-rl;"));
        assert_eq!(out.matches("html {").count(), 1);
    }

    #[test]
    fn test_vertical_is_idempotent() {
        let mut stage = DirectionConverter::vertical();
        let once = css(&mut stage, "body { font-size: 1em; }");
        let twice = css(&mut stage, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_horizontal_strips_properties() {
        let out = css(
            &mut DirectionConverter::horizontal(),
            "html { writing-mode: vertical-rl; -webkit-writing-mode: vertical-rl; }\n\
             body { -epub-writing-mode: vertical-rl; color: black; }\n\
             div { }",
        );
        assert!(!out.contains("writing-mode"));
        assert!(!out.contains("html {"));
        assert!(out.contains("body {\n  color: black;\n}"));
        // Rules that were empty to begin with are left alone.
        assert!(out.contains("div {"));
    }

    #[test]
    fn test_missing_css_is_synthesized_and_linked() {
        let dir = TempDir::new().unwrap();
        let mut stage = DirectionConverter::vertical();
        stage.handle_missing_css(dir.path()).unwrap();
        let synthesized = dir.path().join("Style/style.css");
        assert_eq!(stage.synthesized_stylesheet(), Some(synthesized.as_path()));

        let written = fs::read_to_string(&synthesized).unwrap();
        assert!(written.starts_with("@charset \"utf-8\";\nhtml {"));
        assert!(Stylesheet::parse(&written).is_ok());

        let mut opf = PackageDocument::parse(OPF).unwrap();
        stage.process_opf(&mut opf).unwrap();
        let xml = opf.to_xml();
        assert!(xml.contains(r#"href="Style/style.css""#));
        assert!(xml.contains(r#"page-progression-direction="rtl""#));
        assert_eq!(opf.writing_mode().as_deref(), Some("vertical-rl"));

        let page = dir.path().join("Text/c1.xhtml");
        let html = "<html><body><p>一</p></body></html>";
        let out = stage.process_content(html, &page).unwrap();
        assert!(out.contains(r#"<link rel="stylesheet" href="../Style/style.css" type="text/css"/>"#));
        // A second pass finds the link already there.
        assert_eq!(stage.process_content(&out, &page).unwrap(), out);
    }

    #[test]
    fn test_horizontal_ignores_missing_css() {
        let dir = TempDir::new().unwrap();
        let mut stage = DirectionConverter::horizontal();
        stage.handle_missing_css(dir.path()).unwrap();
        assert!(stage.synthesized_stylesheet().is_none());
        assert!(!dir.path().join("Style").exists());

        let mut opf = PackageDocument::parse(OPF).unwrap();
        stage.process_opf(&mut opf).unwrap();
        assert_eq!(opf.spine_direction().as_deref(), Some("ltr"));
        assert_eq!(opf.writing_mode().as_deref(), Some("horizontal-lr"));
        assert!(!opf.to_xml().contains("Style/style.css"));
    }
}
