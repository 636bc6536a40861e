use std::path::Path;

use super::{Converter, StageConfig};
use crate::config::{Direction, PunctuationPolicy, ScriptConversion};
use crate::dom::{self, Dom, NodeData, NodeId};
use crate::epub::PackageDocument;
use crate::error::Result;
use crate::punctuation::{self, Locale};
use crate::script::{ScriptConverter, ZhconvConverter};

/// Text in these elements is never converted.
const SKIP_ELEMENTS: &[&str] = &["script", "style"];

/// Converts Chinese script variants and quotation punctuation in every text
/// node of a content document.
pub struct LanguageConverter {
    script: Option<Box<dyn ScriptConverter>>,
    /// Set when the caller supplied the script converter.
    injected: bool,
    conversion: Option<ScriptConversion>,
    policy: PunctuationPolicy,
    locales: Option<(Locale, Locale)>,
    direction: Direction,
}

impl LanguageConverter {
    pub fn new() -> Self {
        Self {
            script: None,
            injected: false,
            conversion: None,
            policy: PunctuationPolicy::Auto,
            locales: None,
            direction: Direction::Horizontal,
        }
    }

    /// Use `converter` instead of the built-in one.
    pub fn with_script_converter(mut self, converter: Box<dyn ScriptConverter>) -> Self {
        self.script = Some(converter);
        self.injected = true;
        self
    }

    fn convert_text(&self, text: &str) -> String {
        let converted = match &self.script {
            Some(script) => script.convert(text),
            None => text.to_string(),
        };
        match self.locales {
            Some((source, target)) => punctuation::convert(
                &converted,
                self.direction == Direction::Horizontal,
                source,
                target,
            ),
            None => converted,
        }
    }
}

impl Default for LanguageConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_text_nodes(dom: &Dom, parent: NodeId, out: &mut Vec<NodeId>) {
    for child in dom.children(parent) {
        match dom.get(child).map(|n| &n.data) {
            Some(NodeData::Text(_)) => out.push(child),
            Some(NodeData::Element { name, .. })
                if !SKIP_ELEMENTS.contains(&name.local.as_ref()) =>
            {
                collect_text_nodes(dom, child, out)
            }
            _ => {}
        }
    }
}

impl Converter for LanguageConverter {
    fn name(&self) -> &'static str {
        "language"
    }

    fn receive_config(&mut self, config: &StageConfig) -> Result<()> {
        self.conversion = config.script;
        self.policy = config.punctuation;
        self.direction = config.direction;
        if !self.injected {
            self.script = match config.script {
                Some(conversion) => Some(Box::new(ZhconvConverter::new(conversion)?)),
                None => None,
            };
        }
        self.locales = self.policy.locales(self.conversion, self.direction);
        Ok(())
    }

    fn process_opf(&mut self, opf: &mut PackageDocument) -> Result<()> {
        // Earlier stages may have switched the writing mode; follow the book.
        self.direction = Direction::from_writing_mode(opf.writing_mode().as_deref());
        self.locales = self.policy.locales(self.conversion, self.direction);
        log::debug!(
            "language stage: direction {}, punctuation {:?}",
            self.direction,
            self.locales
        );
        Ok(())
    }

    fn process_content(&mut self, html: &str, _path: &Path) -> Result<String> {
        let mut document = dom::parse(html);
        let root = document
            .find_by_tag("html")
            .unwrap_or_else(|| document.document());

        let mut targets = Vec::new();
        collect_text_nodes(&document, root, &mut targets);
        for id in targets {
            let Some(text) = document.text_content(id) else {
                continue;
            };
            let converted = self.convert_text(text);
            if converted != text {
                document.set_text(id, converted);
            }
        }
        Ok(dom::serialize(&document, true))
    }
}
