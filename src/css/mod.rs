//! Lossless-enough CSS model for rewriting author stylesheets.
//!
//! Rules are kept as text: selectors, declaration values and at-rule bodies
//! are sliced straight out of the source, so only the declarations a stage
//! edits change shape. Comments between rules and inside rule bodies are
//! carried through as their own entries.

use std::fmt::Write;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// Value as written, including any `!important`.
    pub value: String,
}

/// One entry of a rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Declaration(Declaration),
    /// Anything the declaration parser rejected (nested rules, hacks),
    /// carried through verbatim.
    Raw(String),
    /// `/* ... */`, delimiters included.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub items: Vec<BodyItem>,
}

impl StyleRule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            items: Vec::new(),
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter().filter_map(|item| match item {
            BodyItem::Declaration(d) => Some(d),
            _ => None,
        })
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.declarations().any(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.declarations()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| d.value.as_str())
    }

    pub fn push_declaration(&mut self, name: &str, value: &str) {
        self.items.push(BodyItem::Declaration(Declaration {
            name: name.to_string(),
            value: value.to_string(),
        }));
    }

    /// Remove every declaration of `name`, returning how many were removed.
    pub fn remove_property(&mut self, name: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|item| match item {
            BodyItem::Declaration(d) => !d.name.eq_ignore_ascii_case(name),
            _ => true,
        });
        before - self.items.len()
    }

    /// No declarations or raw items; comments alone do not count.
    pub fn is_empty(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item, BodyItem::Comment(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Style(StyleRule),
    /// Block-less at-rule such as `@import url(a.css);`.
    AtStatement { name: String, prelude: String },
    /// At-rule with a block (`@media`, `@font-face`, ...), body kept raw.
    AtBlock {
        name: String,
        prelude: String,
        body: String,
    },
    /// Top-level `/* ... */`, delimiters included.
    Comment(String),
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Leading `@charset` statement, which the rule parser skips.
    charset: Option<String>,
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Parse a stylesheet.
    ///
    /// Invalid declarations inside a rule are tolerated and kept verbatim; a
    /// top-level construct that is not a rule fails the whole sheet.
    pub fn parse(css: &str) -> Result<Self> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rule_parser = TopLevelRuleParser;
        let mut rules = Vec::new();

        let mut sheet = StyleSheetParser::new(&mut parser, &mut rule_parser);
        loop {
            let before = sheet.input.position();
            let next = sheet.next();
            let consumed = sheet.input.slice(before..sheet.input.position());
            rules.extend(leading_comments(consumed).map(Rule::Comment));
            let Some(result) = next else {
                break;
            };
            match result {
                Ok(rule) => rules.push(rule),
                Err((error, slice)) => {
                    return Err(Error::StylesheetParse {
                        line: error.location.line + 1,
                        column: error.location.column,
                        message: format!("{:?} near {:?}", error.kind, slice.trim()),
                    });
                }
            }
        }

        let charset = leading_charset(css);
        if charset.is_some() {
            rules.retain(|rule| {
                !matches!(rule, Rule::AtStatement { name, .. } if name.eq_ignore_ascii_case("charset"))
            });
        }

        Ok(Self { charset, rules })
    }

    pub fn style_rules_mut(&mut self) -> impl Iterator<Item = &mut StyleRule> {
        self.rules.iter_mut().filter_map(|rule| match rule {
            Rule::Style(style) => Some(style),
            _ => None,
        })
    }

    pub fn push_rule(&mut self, rule: StyleRule) {
        self.rules.push(Rule::Style(rule));
    }

    /// Serialize, one rule per block, one declaration per line.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        if let Some(charset) = &self.charset {
            out.push_str(charset);
            out.push('\n');
        }
        for rule in &self.rules {
            match rule {
                Rule::Style(style) => {
                    let _ = writeln!(out, "{} {{", style.selector);
                    for item in &style.items {
                        match item {
                            BodyItem::Declaration(d) => {
                                let _ = writeln!(out, "  {}: {};", d.name, d.value);
                            }
                            BodyItem::Raw(raw) if raw.ends_with([';', '}']) => {
                                let _ = writeln!(out, "  {raw}");
                            }
                            BodyItem::Raw(raw) => {
                                let _ = writeln!(out, "  {raw};");
                            }
                            BodyItem::Comment(comment) => {
                                let _ = writeln!(out, "  {comment}");
                            }
                        }
                    }
                    out.push_str("}\n");
                }
                Rule::Comment(comment) => {
                    let _ = writeln!(out, "{comment}");
                }
                Rule::AtStatement { name, prelude } if prelude.is_empty() => {
                    let _ = writeln!(out, "@{name};");
                }
                Rule::AtStatement { name, prelude } => {
                    let _ = writeln!(out, "@{name} {prelude};");
                }
                Rule::AtBlock {
                    name,
                    prelude,
                    body,
                } => {
                    if prelude.is_empty() {
                        let _ = writeln!(out, "@{name} {{{body}}}");
                    } else {
                        let _ = writeln!(out, "@{name} {prelude} {{{body}}}");
                    }
                }
            }
        }
        out
    }
}

fn leading_charset(css: &str) -> Option<String> {
    let trimmed = css.trim_start_matches('\u{feff}').trim_start();
    if !trimmed.starts_with("@charset") {
        return None;
    }
    let end = trimmed.find(';')?;
    Some(trimmed[..=end].to_string())
}

/// Comments at the start of `text`, before the first token that is not
/// whitespace, a comment, `<!--`/`-->` or a skipped `@charset` statement.
fn leading_comments(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut rest = text;
    std::iter::from_fn(move || {
        loop {
            rest = rest.trim_start();
            if let Some(body) = rest.strip_prefix("/*") {
                let end = body.find("*/")?;
                let comment = &rest[..end + 4];
                rest = &body[end + 2..];
                return Some(comment.to_string());
            } else if let Some(after) = rest.strip_prefix("<!--").or_else(|| rest.strip_prefix("-->")) {
                rest = after;
            } else if rest.starts_with("@charset") {
                rest = &rest[rest.find(';')? + 1..];
            } else {
                return None;
            }
        }
    })
}

/// Consume the rest of `input` and return its source text.
fn rest_as_text<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start)
}

struct TopLevelRuleParser;

impl<'i> AtRuleParser<'i> for TopLevelRuleParser {
    type Prelude = (String, String);
    type AtRule = Rule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let prelude = rest_as_text(input).trim().to_string();
        Ok((name.to_string(), prelude))
    }

    fn rule_without_block(
        &mut self,
        (name, prelude): Self::Prelude,
        _start: &ParserState,
    ) -> std::result::Result<Self::AtRule, ()> {
        Ok(Rule::AtStatement { name, prelude })
    }

    fn parse_block<'t>(
        &mut self,
        (name, prelude): Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let body = rest_as_text(input).to_string();
        Ok(Rule::AtBlock {
            name,
            prelude,
            body,
        })
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser {
    type Prelude = String;
    type QualifiedRule = Rule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok(rest_as_text(input).trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut rule = StyleRule::new(prelude);
        let mut body_parser = RuleBodyItems;

        let mut body = RuleBodyParser::new(input, &mut body_parser);
        loop {
            let before = body.input.position();
            let next = body.next();
            let consumed = body.input.slice(before..body.input.position());
            rule.items.extend(leading_comments(consumed).map(BodyItem::Comment));
            let Some(result) = next else {
                break;
            };
            match result {
                Ok(declaration) => rule.items.push(BodyItem::Declaration(declaration)),
                Err((_, slice)) => {
                    let raw = slice.trim();
                    if !raw.is_empty() {
                        log::debug!("keeping unparsed css {raw:?} in {:?}", rule.selector);
                        rule.items.push(BodyItem::Raw(raw.to_string()));
                    }
                }
            }
        }

        Ok(Rule::Style(rule))
    }
}

/// Declaration parser for the inside of a style rule. Nested rules are
/// rejected so they surface as raw items.
struct RuleBodyItems;

impl<'i> AtRuleParser<'i> for RuleBodyItems {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleBodyItems {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for RuleBodyItems {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> std::result::Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let value = rest_as_text(input).trim().to_string();
        Ok(Declaration {
            name: name.to_string(),
            value,
        })
    }
}

impl<'i> RuleBodyItemParser<'i, Declaration, ()> for RuleBodyItems {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
