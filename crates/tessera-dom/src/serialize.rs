//! HTML Serialization (innerHTML/outerHTML)
//!
//! Key features:
//! - Proper HTML escaping
//! - Void element handling
//! - Optional charset rewrite of the meta declaration on the way out
//!
//! The walk keeps its own stack, so nesting depth is bounded by memory
//! rather than the call stack.

use crate::{meta, DomTree, ElementData, NodeData, NodeId};

/// HTML serializer
#[derive(Debug, Clone, Default)]
pub struct HtmlSerializer {
    /// Charset written into meta declarations instead of the stored one
    pub charset: Option<String>,
}

/// Void elements (no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

enum Step {
    Open(NodeId),
    Close(NodeId),
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite meta charset declarations to `charset` in the output
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Serialize the whole tree
    pub fn serialize_document(&self, tree: &DomTree) -> String {
        self.serialize_inner(tree, tree.root())
    }

    /// Serialize innerHTML of a node (children only)
    pub fn serialize_inner(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        let mut stack = Vec::new();
        push_children(tree, node_id, &mut stack);
        self.run(tree, stack, &mut output);
        output
    }

    /// Serialize outerHTML of a node (including the node itself)
    pub fn serialize_outer(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.run(tree, vec![Step::Open(node_id)], &mut output);
        output
    }

    fn run(&self, tree: &DomTree, mut stack: Vec<Step>, output: &mut String) {
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => self.open(tree, id, output, &mut stack),
                Step::Close(id) => {
                    if let Some(elem) = tree.get(id).and_then(|n| n.as_element()) {
                        output.push_str("</");
                        output.push_str(&elem.name);
                        output.push('>');
                    }
                }
            }
        }
    }

    fn open(&self, tree: &DomTree, node_id: NodeId, output: &mut String, stack: &mut Vec<Step>) {
        let Some(node) = tree.get(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Document => push_children(tree, node_id, stack),
            NodeData::Element(elem) => {
                self.write_start_tag(elem, output);
                let tag = elem.name.as_str();
                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }
                if RAW_TEXT_ELEMENTS.contains(&tag) {
                    for (_, child) in tree.children(node_id) {
                        if let NodeData::Text(text) = &child.data {
                            output.push_str(&text.content);
                        }
                    }
                    stack.push(Step::Close(node_id));
                    return;
                }
                stack.push(Step::Close(node_id));
                push_children(tree, node_id, stack);
            }
            NodeData::Text(text) => escape_text(&text.content, output),
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            NodeData::Doctype { name, public_id, system_id } => {
                output.push_str("<!DOCTYPE ");
                output.push_str(name);
                if !public_id.is_empty() {
                    output.push_str(" PUBLIC \"");
                    output.push_str(public_id);
                    output.push('"');
                    if !system_id.is_empty() {
                        output.push_str(" \"");
                        output.push_str(system_id);
                        output.push('"');
                    }
                } else if !system_id.is_empty() {
                    output.push_str(" SYSTEM \"");
                    output.push_str(system_id);
                    output.push('"');
                }
                output.push('>');
            }
            NodeData::ProcessingInstruction { target, data } => {
                output.push_str("<?");
                output.push_str(target);
                if !data.is_empty() {
                    output.push(' ');
                    output.push_str(data);
                }
                output.push('>');
            }
        }
    }

    fn write_start_tag(&self, elem: &ElementData, output: &mut String) {
        output.push('<');
        output.push_str(&elem.name);

        let declaration = match &self.charset {
            Some(charset) if elem.name == "meta" => meta::declaration(elem).map(|d| (d, charset)),
            _ => None,
        };

        for attr in elem.attrs.iter() {
            output.push(' ');
            output.push_str(&attr.name);

            let rewritten = declaration
                .as_ref()
                .and_then(|(decl, charset)| decl.rewritten_attr(&attr.name, charset));
            let value = rewritten.as_deref().unwrap_or(&attr.value);
            if !value.is_empty() {
                output.push_str("=\"");
                escape_attribute(value, output);
                output.push('"');
            }
        }
        output.push('>');
    }
}

/// Queue the children of `parent` so they pop in document order
fn push_children(tree: &DomTree, parent: NodeId, stack: &mut Vec<Step>) {
    let start = stack.len();
    stack.extend(tree.children(parent).map(|(id, _)| Step::Open(id)));
    stack[start..].reverse();
}

/// Escape text content for HTML
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}
