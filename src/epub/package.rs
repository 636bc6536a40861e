//! OPF package document, kept as an owned XML tree.
//!
//! The stages only touch a handful of nodes (spine direction, one metadata
//! entry, one manifest item), so everything else is carried through
//! verbatim: text and attribute values stay in their escaped source form and
//! comments, doctype and processing instructions are written back as read.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

const WRITING_MODE_META: &str = "primary-writing-mode";

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Escaped character data, including entity references.
    Text(String),
    CData(String),
    Comment(String),
    /// Declaration or processing instruction body, without `<?` `?>`.
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `dc:language`.
    pub name: String,
    /// Attribute names with their escaped values.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Written as `<name/>` when it has no children.
    pub self_closing: bool,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    fn from_start(e: &BytesStart<'_>, self_closing: bool) -> Self {
        let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        element.self_closing = self_closing;
        for attr in e.attributes().with_checks(false).flatten() {
            element.attrs.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ));
        }
        element
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Namespace prefix including the colon, or an empty string.
    fn prefix(&self) -> &str {
        &self.name[..self.name.len() - self.local_name().len()]
    }

    /// Unescaped attribute value, matched by local name.
    pub fn attr(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attrs
            .iter()
            .find(|(key, _)| local_name(key) == name)
            .map(|(_, value)| unescape(value).unwrap_or(Cow::Borrowed(value.as_str())))
    }

    /// Set an attribute, escaping `value`. Returns `false` if it already
    /// held that value.
    pub fn set_attr(&mut self, name: &str, value: &str) -> bool {
        if self.attr(name).as_deref() == Some(value) {
            return false;
        }
        let escaped = escape(value).into_owned();
        match self.attrs.iter_mut().find(|(key, _)| local_name(key) == name) {
            Some((_, existing)) => *existing = escaped,
            None => self.attrs.push((name.to_string(), escaped)),
        }
        true
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|child| match child {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First descendant (or self) with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        if self.local_name() == local {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(local))
    }

    pub fn find_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        if self.local_name() == local {
            return Some(self);
        }
        self.elements_mut().find_map(|child| child.find_mut(local))
    }

    /// Unescaped, trimmed text content.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => raw.push_str(t),
                XmlNode::CData(t) => raw.push_str(t),
                XmlNode::Element(e) => raw.push_str(&e.text()),
                _ => {}
            }
        }
        let text = unescape(&raw).map(Cow::into_owned).unwrap_or(raw.clone());
        text.trim().to_string()
    }

    /// Append a child element after the last existing element child,
    /// reusing that child's leading whitespace so the output stays aligned.
    pub fn append_element(&mut self, element: XmlElement) {
        let last = self
            .children
            .iter()
            .rposition(|child| matches!(child, XmlNode::Element(_)));

        let Some(last) = last else {
            self.self_closing = false;
            self.children.push(XmlNode::Element(element));
            return;
        };

        let indent = match last.checked_sub(1).map(|i| &self.children[i]) {
            Some(XmlNode::Text(t)) if t.trim().is_empty() => Some(t.clone()),
            _ => None,
        };

        let mut at = last + 1;
        if let Some(indent) = indent {
            self.children.insert(at, XmlNode::Text(indent));
            at += 1;
        }
        self.children.insert(at, XmlNode::Element(element));
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            let quote = if value.contains('"') { '\'' } else { '"' };
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push(quote);
            out.push_str(value);
            out.push(quote);
        }
        if self.children.is_empty() && self.self_closing {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl XmlNode {
    fn write(&self, out: &mut String) {
        match self {
            XmlNode::Element(e) => e.write(out),
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            XmlNode::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            XmlNode::ProcessingInstruction(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            XmlNode::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t.trim_start());
                out.push('>');
            }
        }
    }
}

/// A manifest `<item>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Unescaped href, still percent-encoded.
    pub href: String,
    pub media_type: String,
}

/// Parsed package document.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDocument {
    /// Top-level nodes: prolog, the `<package>` root and any trailing
    /// comments.
    nodes: Vec<XmlNode>,
}

impl PackageDocument {
    /// Parse a package document.
    ///
    /// Fails with [`Error::MalformedPackage`] when the root, `metadata`,
    /// `manifest` or `spine` element is missing.
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut top: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();

        fn push(top: &mut Vec<XmlNode>, stack: &mut [XmlElement], node: XmlNode) {
            let siblings = match stack.last_mut() {
                Some(parent) => &mut parent.children,
                None => top,
            };
            if let XmlNode::Text(text) = &node
                && let Some(XmlNode::Text(prev)) = siblings.last_mut()
            {
                prev.push_str(text);
                return;
            }
            siblings.push(node);
        }

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(XmlElement::from_start(&e, false)),
                Event::Empty(e) => {
                    push(&mut top, &mut stack, XmlNode::Element(XmlElement::from_start(&e, true)))
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(Error::MalformedPackage("unbalanced end tag".into()));
                    };
                    push(&mut top, &mut stack, XmlNode::Element(element));
                }
                Event::Text(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push(&mut top, &mut stack, XmlNode::Text(text));
                }
                Event::GeneralRef(e) => {
                    let text = format!("&{};", String::from_utf8_lossy(e.as_ref()));
                    push(&mut top, &mut stack, XmlNode::Text(text));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push(&mut top, &mut stack, XmlNode::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push(&mut top, &mut stack, XmlNode::Comment(text));
                }
                Event::Decl(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    push(&mut top, &mut stack, XmlNode::ProcessingInstruction(text));
                }
                Event::PI(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push(&mut top, &mut stack, XmlNode::ProcessingInstruction(text));
                }
                Event::DocType(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push(&mut top, &mut stack, XmlNode::DocType(text));
                }
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::MalformedPackage(format!("unclosed <{}>", open.name)));
        }

        let doc = PackageDocument { nodes: top };
        let root = doc
            .root()
            .ok_or_else(|| Error::MalformedPackage("no root element".into()))?;
        for required in ["metadata", "manifest", "spine"] {
            if root.find(required).is_none() {
                return Err(Error::MalformedPackage(format!("missing <{required}>")));
            }
        }
        Ok(doc)
    }

    /// Serialize back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write(&mut out);
        }
        out
    }

    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    fn root_mut(&mut self) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().find_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    fn section(&self, local: &str) -> Result<&XmlElement> {
        self.root()
            .and_then(|root| root.find(local))
            .ok_or_else(|| Error::MalformedPackage(format!("missing <{local}>")))
    }

    fn section_mut(&mut self, local: &str) -> Result<&mut XmlElement> {
        self.root_mut()
            .and_then(|root| root.find_mut(local))
            .ok_or_else(|| Error::MalformedPackage(format!("missing <{local}>")))
    }

    /// Declared `dc:language`, if any.
    pub fn language(&self) -> Option<String> {
        let metadata = self.section("metadata").ok()?;
        metadata
            .elements()
            .find(|e| e.local_name() == "language")
            .map(|e| e.text())
            .filter(|lang| !lang.is_empty())
    }

    /// The spine's `page-progression-direction`.
    pub fn spine_direction(&self) -> Option<String> {
        self.section("spine")
            .ok()?
            .attr("page-progression-direction")
            .map(Cow::into_owned)
    }

    /// Set the spine's `page-progression-direction`. Returns `false` when the
    /// value was already in place.
    pub fn set_spine_direction(&mut self, direction: &str) -> Result<bool> {
        Ok(self
            .section_mut("spine")?
            .set_attr("page-progression-direction", direction))
    }

    fn is_writing_mode_meta(element: &XmlElement) -> bool {
        element.local_name() == "meta"
            && element.attr("name").as_deref() == Some(WRITING_MODE_META)
    }

    /// Content of the `primary-writing-mode` meta, if present.
    pub fn writing_mode(&self) -> Option<String> {
        self.section("metadata")
            .ok()?
            .elements()
            .find(|e| Self::is_writing_mode_meta(e))
            .and_then(|e| e.attr("content").map(Cow::into_owned))
    }

    /// Update the `primary-writing-mode` meta in place, or insert one.
    pub fn set_writing_mode(&mut self, mode: &str) -> Result<()> {
        let metadata = self.section_mut("metadata")?;
        if let Some(meta) = metadata.elements_mut().find(|e| Self::is_writing_mode_meta(e)) {
            meta.set_attr("content", mode);
            return Ok(());
        }

        let mut meta = XmlElement::new(format!("{}meta", metadata.prefix()));
        meta.self_closing = true;
        meta.set_attr("name", WRITING_MODE_META);
        meta.set_attr("content", mode);
        metadata.append_element(meta);
        Ok(())
    }

    pub fn manifest_items(&self) -> Vec<ManifestItem> {
        let Ok(manifest) = self.section("manifest") else {
            return Vec::new();
        };
        manifest
            .elements()
            .filter(|e| e.local_name() == "item")
            .map(|e| ManifestItem {
                id: e.attr("id").map(Cow::into_owned).unwrap_or_default(),
                href: e.attr("href").map(Cow::into_owned).unwrap_or_default(),
                media_type: e.attr("media-type").map(Cow::into_owned).unwrap_or_default(),
            })
            .collect()
    }

    /// Add a manifest item for `href`, returning its id.
    ///
    /// An existing item with the same href is reused. New ids are derived
    /// from `id_base`, suffixed with a counter when taken.
    pub fn add_manifest_item(&mut self, id_base: &str, href: &str, media_type: &str) -> Result<String> {
        let items = self.manifest_items();
        if let Some(existing) = items.iter().find(|item| item.href == href) {
            return Ok(existing.id.clone());
        }

        let taken = |candidate: &str| items.iter().any(|item| item.id == candidate);
        let mut id = id_base.to_string();
        let mut n = 1;
        while taken(&id) {
            id = format!("{id_base}-{n}");
            n += 1;
        }

        let manifest = self.section_mut("manifest")?;
        let mut item = XmlElement::new(format!("{}item", manifest.prefix()));
        item.self_closing = true;
        item.set_attr("id", &id);
        item.set_attr("href", href);
        item.set_attr("media-type", media_type);
        manifest.append_element(item);
        Ok(id)
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}
