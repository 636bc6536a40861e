//! Feeds html5ever's tree builder into a [`Dom`].

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};

use super::arena::{Attribute, Dom, NodeData, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl Default for NodeHandle {
    fn default() -> Self {
        NodeHandle(NodeId::NONE)
    }
}

/// Tree builder target. html5ever drives it through `&self`, hence the
/// RefCell.
pub struct DomSink {
    dom: RefCell<Dom>,
    quirks_mode: RefCell<QuirksMode>,
}

impl Default for DomSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(Dom::new()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    pub fn into_dom(self) -> Dom {
        self.dom.into_inner()
    }

    fn edit<R>(&self, f: impl FnOnce(&mut Dom) -> R) -> R {
        f(&mut self.dom.borrow_mut())
    }

    fn insert(dom: &mut Dom, child: NodeOrText<NodeHandle>, place: impl FnOnce(&mut Dom, NodeId)) {
        let id = match child {
            NodeOrText::AppendNode(node) => node.0,
            NodeOrText::AppendText(text) => dom.create_text(text.to_string()),
        };
        place(dom, id);
    }
}

fn convert_attrs(attrs: Vec<Html5Attribute>) -> Vec<Attribute> {
    attrs
        .into_iter()
        .map(|a| Attribute {
            name: a.name,
            value: a.value.to_string(),
        })
        .collect()
}

impl TreeSink for DomSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        log::trace!("html parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        NodeHandle(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static NO_NAME: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let dom = self.dom.borrow();
        let Some(NodeData::Element { name, .. }) = dom.get(target.0).map(|n| &n.data) else {
            return &NO_NAME;
        };
        // SAFETY: the name lives in the arena owned by self. The tree builder
        // drops the reference before its next call into the sink, so the
        // arena cannot reallocate while it is held.
        unsafe { std::mem::transmute::<&QualName, &'a QualName>(name) }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        NodeHandle(self.edit(|dom| dom.create_element(name, convert_attrs(attrs))))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        NodeHandle(self.edit(|dom| dom.create_comment(text.to_string())))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        // Stored as a `?`-prefixed comment; the writer turns it back into
        // `<?target data?>`.
        NodeHandle(self.edit(|dom| dom.create_comment(format!("?{target} {data}?"))))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.edit(|dom| match child {
            // Adjacent text merges into one node.
            NodeOrText::AppendText(text) => dom.append_text(parent.0, &text),
            node => Self::insert(dom, node, |dom, id| dom.append(parent.0, id)),
        });
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self
            .dom
            .borrow()
            .get(element.0)
            .map(|n| n.parent)
            .filter(NodeId::is_some);
        match parent {
            Some(_) => self.append_before_sibling(element, child),
            None => self.append(prev_element, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.edit(|dom| {
            let doctype =
                dom.create_doctype(name.to_string(), public_id.to_string(), system_id.to_string());
            let document = dom.document();
            dom.append(document, doctype);
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents live directly under the template element.
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        self.edit(|dom| Self::insert(dom, new_node, |dom, id| dom.insert_before(sibling.0, id)));
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        self.edit(|dom| {
            let Some(NodeData::Element {
                attrs: existing, ..
            }) = dom.get_mut(target.0).map(|n| &mut n.data)
            else {
                return;
            };
            for attr in convert_attrs(attrs) {
                if !existing.iter().any(|a| a.name == attr.name) {
                    existing.push(attr);
                }
            }
        });
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.edit(|dom| dom.detach(target.0));
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        self.edit(|dom| {
            let children: Vec<NodeId> = dom.children(node.0).collect();
            for child in children {
                dom.detach(child);
                dom.append(new_parent.0, child);
            }
        });
    }
}
