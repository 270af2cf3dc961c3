//! Minimal lossless XML tree
//!
//! Build descriptors are edited in place: whatever is not touched (comments,
//! formatting, entity escapes, unknown elements) is written back verbatim.
//! Text and attribute values are kept in their escaped source form.

use crate::error::{ArchetypeError, Result};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A node inside an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped character data
    Text(String),
    /// Comments, CDATA, processing instructions: written back verbatim
    Raw(String),
}

/// An element with its attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// `(name, escaped value)` pairs in source order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed document: root element plus whatever surrounds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ArchetypeError::wrap("XML is not valid UTF-8", e))
}

fn indent(depth: usize) -> String {
    format!("\n{}", "  ".repeat(depth))
}

fn is_whitespace(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.trim().is_empty())
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// `<name>value</name>`, escaping `value`
    pub fn with_text(name: impl Into<String>, value: &str) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(escape(value).into_owned()));
        element
    }

    fn from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<Self> {
        let mut element = Self::new(utf8(start.name().as_ref())?);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ArchetypeError::wrap("Malformed XML attribute", e))?;
            element
                .attributes
                .push((utf8(attr.key.as_ref())?, utf8(&attr.value)?));
        }
        Ok(element)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Unescaped, trimmed character data of this element
    pub fn text(&self) -> Option<String> {
        let raw: String = self
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        let value = unescape(&raw).map(|v| v.into_owned()).unwrap_or(raw);
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(Element::text)
    }

    /// Replace the text of child `name`, creating it when missing
    pub fn set_child_text(&mut self, name: &str, value: &str, depth: usize) {
        match self.child_mut(name) {
            Some(child) => {
                child.children = vec![Node::Text(escape(value).into_owned())];
            }
            None => self.append_child(Element::with_text(name, value), depth),
        }
    }

    /// Indentation used before existing child elements, if any
    fn child_indent(&self) -> Option<String> {
        self.children.windows(2).find_map(|pair| match pair {
            [Node::Text(ws), Node::Element(_)] if ws.trim().is_empty() => Some(ws.clone()),
            _ => None,
        })
    }

    /// Append `child` as the last element; `depth` is this element's nesting level
    pub fn append_child(&mut self, child: Element, depth: usize) {
        let closing = match self.children.last() {
            Some(node) if is_whitespace(node) => self.children.pop(),
            _ => None,
        }
        .unwrap_or_else(|| Node::Text(indent(depth)));
        let child_indent = self.child_indent().unwrap_or_else(|| indent(depth + 1));

        self.children.push(Node::Text(child_indent));
        self.children.push(Node::Element(child));
        self.children.push(closing);
    }

    /// Insert `child` right after the first element named `after`, or append it
    pub fn insert_child_after(&mut self, after: &str, child: Element, depth: usize) {
        let position = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name == after));
        match position {
            Some(index) => {
                let child_indent = self.child_indent().unwrap_or_else(|| indent(depth + 1));
                self.children
                    .splice(index + 1..index + 1, [Node::Text(child_indent), Node::Element(child)]);
            }
            None => self.append_child(child, depth),
        }
    }

    /// Child `name`, created empty when missing
    pub fn ensure_child(&mut self, name: &str, depth: usize) -> &mut Element {
        if self.child(name).is_none() {
            self.append_child(Element::new(name), depth);
        }
        self.child_mut(name).expect("child exists after insertion")
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            write_attribute(key, value, out);
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Values are kept escaped but not re-quoted, so pick a quote they do not contain
fn write_attribute(key: &str, value: &str, out: &mut String) {
    let attribute = if !value.contains('"') {
        format!(" {}=\"{}\"", key, value)
    } else if !value.contains('\'') {
        format!(" {}='{}'", key, value)
    } else {
        format!(" {}=\"{}\"", key, value.replace('"', "&quot;"))
    };
    out.push_str(&attribute);
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => e.write_to(out),
        Node::Text(t) | Node::Raw(t) => out.push_str(t),
    }
}

impl Document {
    /// Parse a UTF-8 XML document
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let node = match reader.read_event()? {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(Element::from_start(&start)?);
                    continue;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ArchetypeError::failure("Unbalanced XML end tag"))?;
                    Node::Element(element)
                }
                Event::Empty(start) => Node::Element(Element::from_start(&start)?),
                Event::Text(text) => Node::Text(utf8(&text)?),
                Event::CData(data) => Node::Raw(format!("<![CDATA[{}]]>", utf8(&data)?)),
                Event::Comment(comment) => Node::Raw(format!("<!--{}-->", utf8(&comment)?)),
                Event::Decl(decl) => Node::Raw(format!("<?{}?>", utf8(&decl)?)),
                Event::PI(pi) => Node::Raw(format!("<?{}?>", utf8(&pi)?)),
                Event::DocType(doctype) => {
                    Node::Raw(format!("<!DOCTYPE {}>", utf8(&doctype)?.trim_start()))
                }
            };

            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => match node {
                    Node::Element(element) if root.is_none() => root = Some(element),
                    Node::Element(element) => {
                        return Err(ArchetypeError::failure(format!(
                            "Unexpected second root element <{}>",
                            element.name
                        )))
                    }
                    other if root.is_none() => prolog.push(other),
                    other => epilog.push(other),
                },
            }
        }

        if let Some(open) = stack.last() {
            return Err(ArchetypeError::failure(format!(
                "Unclosed XML element <{}>",
                open.name
            )));
        }
        let root = root.ok_or_else(|| ArchetypeError::failure("XML document has no root element"))?;
        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            write_node(node, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!-- keep me -->\n\
<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n  \
<name>A &amp; B</name>\n  \
<description><![CDATA[<raw>]]></description>\n  \
<modules/>\n\
</project>\n";

    #[test]
    fn test_untouched_document_is_written_back_verbatim() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(doc.to_xml(), DOC);
    }

    #[test]
    fn test_text_is_unescaped_on_read() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(doc.root.child_text("name").as_deref(), Some("A & B"));
        assert_eq!(doc.root.attributes[0].0, "xmlns");
    }

    #[test]
    fn test_attribute_quotes_survive_rewrite() {
        let xml = "<project a='say \"hi\"' b=\"it's\"/>";
        let doc = Document::parse(xml).unwrap();
        let written = doc.to_xml();
        assert_eq!(written, xml);
        assert_eq!(Document::parse(&written).unwrap(), doc);

        let mut mixed = Element::new("plugin");
        mixed
            .attributes
            .push(("c".to_string(), "'a' \"b\"".to_string()));
        let mut out = String::new();
        mixed.write_to(&mut out);
        assert_eq!(out, "<plugin c=\"'a' &quot;b&quot;\"/>");
    }

    #[test]
    fn test_append_child_into_self_closing_element() {
        let mut doc = Document::parse(DOC).unwrap();
        doc.root
            .child_mut("modules")
            .unwrap()
            .append_child(Element::with_text("module", "core"), 1);
        assert!(doc
            .to_xml()
            .contains("<modules>\n    <module>core</module>\n  </modules>"));
    }

    #[test]
    fn test_append_child_reuses_existing_indentation() {
        let mut doc = Document::parse(DOC).unwrap();
        doc.root.append_child(Element::with_text("packaging", "pom"), 0);
        assert!(doc
            .to_xml()
            .ends_with("<modules/>\n  <packaging>pom</packaging>\n</project>\n"));
    }

    #[test]
    fn test_set_child_text_escapes_value() {
        let mut doc = Document::parse(DOC).unwrap();
        doc.root.set_child_text("name", "C < D", 0);
        assert!(doc.to_xml().contains("<name>C &lt; D</name>"));
        assert_eq!(doc.root.child_text("name").as_deref(), Some("C < D"));
    }

    #[test]
    fn test_insert_child_after() {
        let mut doc = Document::parse(DOC).unwrap();
        doc.root.insert_child_after("name", Element::new("url"), 0);
        assert!(doc.to_xml().contains("<name>A &amp; B</name>\n  <url/>\n  <description>"));
    }

    #[test]
    fn test_unclosed_document_is_rejected() {
        assert!(Document::parse("<project><build>").is_err());
        assert!(Document::parse("   ").is_err());
    }
}
