//! Markup parsing engine
//!
//! [`ParseEngine`] is the seam between the document layer and whatever
//! tokenizes and builds trees. [`Html5everEngine`] parses with html5ever into
//! its `RcDom` and converts the result to our arena tree, applying the
//! [`ParseOptions`] that html5ever has no notion of.

use std::cell::Cell;

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::{LocalName, TokenizerResult, Namespace, ParseOpts, QualName, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use tessera_dom::{meta, Attribute, DomTree, ElementData, MetaError, NodeData, NodeId, HTML_NAMESPACE};

use crate::encoding::{self, DecodedAs};
use crate::{EngineError, EngineInput, FragmentContext, ParseOptions};

/// Public identifier of the doctype added when markup has none
pub const DEFAULT_DOCTYPE_PUBLIC_ID: &str = "-//W3C//DTD HTML 4.0 Transitional//EN";
/// System identifier of the doctype added when markup has none
pub const DEFAULT_DOCTYPE_SYSTEM_ID: &str = "http://www.w3.org/TR/REC-html40/loose.dtd";

/// A tree produced by an engine
#[derive(Debug, Clone)]
pub struct ParsedTree {
    pub tree: DomTree,
    /// Encoding the content was decoded with
    pub decoded_as: DecodedAs,
}

/// Tree-producing collaborator driven by the document layer
pub trait ParseEngine: Send + Sync {
    /// Parse a full document
    fn parse(&self, input: EngineInput<'_>, options: ParseOptions) -> Result<ParsedTree, EngineError>;

    /// Parse a fragment as if it were the content of `context`. The returned
    /// tree's document node holds the fragment's top-level nodes.
    fn parse_fragment(
        &self,
        context: &FragmentContext,
        input: EngineInput<'_>,
        options: ParseOptions,
    ) -> Result<ParsedTree, EngineError>;

    /// A minimal valid tree: a doctype and no elements
    fn create_empty_tree(&self) -> DomTree {
        empty_tree()
    }

    fn read_meta_charset(&self, tree: &DomTree) -> Option<String> {
        meta::read_meta_charset(tree)
    }

    fn write_meta_charset(&self, tree: &mut DomTree, encoding: &str) -> Result<(), MetaError> {
        meta::write_meta_charset(tree, encoding)
    }
}

/// Tree holding only the default doctype
pub fn empty_tree() -> DomTree {
    let mut tree = DomTree::new();
    let doctype = tree.create_doctype("html", DEFAULT_DOCTYPE_PUBLIC_ID, DEFAULT_DOCTYPE_SYSTEM_ID);
    tree.append_child(tree.root(), doctype);
    tree
}

/// html5ever-backed engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Html5everEngine;

impl Html5everEngine {
    pub fn new() -> Self {
        Self
    }

    fn decode(&self, input: &EngineInput<'_>, options: ParseOptions) -> Result<(String, DecodedAs), EngineError> {
        let decoded_as = match encoding::resolve(input.encoding, input.content, options) {
            Ok(decoded_as) => decoded_as,
            Err(err) if options.contains(ParseOptions::RECOVER) => {
                if !options.contains(ParseOptions::NO_WARNING) {
                    tracing::warn!("{}, sniffing the encoding instead", err);
                }
                encoding::resolve(None, input.content, options)?
            }
            Err(err) => return Err(err),
        };

        let (text, had_errors) = encoding::decode(input.content, decoded_as);
        if had_errors {
            if !options.contains(ParseOptions::RECOVER) {
                return Err(EngineError::Malformed {
                    encoding: decoded_as.name(),
                });
            }
            if !options.contains(ParseOptions::NO_WARNING) {
                tracing::warn!("Replaced malformed {} sequences in input", decoded_as.name());
            }
        }
        Ok((text.into_owned(), decoded_as))
    }

    fn parse_opts(options: ParseOptions) -> ParseOpts {
        let exact = options.contains(ParseOptions::PEDANTIC);
        let mut opts = ParseOpts::default();
        opts.tokenizer.exact_errors = exact;
        opts.tree_builder.exact_errors = exact;
        opts
    }

    /// Report the errors html5ever collected; reject unless recovering
    fn check_errors(dom: &RcDom, options: ParseOptions) -> Result<(), EngineError> {
        let errors = dom.errors.borrow();
        if errors.is_empty() {
            return Ok(());
        }
        if !options.contains(ParseOptions::NO_ERROR) {
            for error in errors.iter() {
                tracing::warn!("HTML parse error: {}", error);
            }
        }
        if options.contains(ParseOptions::RECOVER) {
            return Ok(());
        }
        Err(EngineError::Rejected {
            errors: errors.len(),
            first: errors[0].to_string(),
        })
    }
}

impl ParseEngine for Html5everEngine {
    fn parse(&self, input: EngineInput<'_>, options: ParseOptions) -> Result<ParsedTree, EngineError> {
        let (text, decoded_as) = self.decode(&input, options)?;
        tracing::debug!("Parsing {} chars decoded as {}", text.len(), decoded_as.name());

        let dom = parse_document(RcDom::default(), Self::parse_opts(options)).one(text.as_str());
        Self::check_errors(&dom, options)?;

        let mut converter = Converter::new(options);
        converter.convert(&dom.document, NodeId::ROOT);
        let mut tree = converter.finish();

        if options.contains(ParseOptions::NO_IMPLIED) {
            remove_implied(&mut tree, &text);
        }
        if !options.contains(ParseOptions::NO_DEFAULT_DOCTYPE) {
            add_default_doctype(&mut tree);
        }
        if options.contains(ParseOptions::COMPACT) {
            tree.normalize(tree.root());
        }

        tracing::debug!("Parsed {} nodes", tree.node_count());
        Ok(ParsedTree { tree, decoded_as })
    }

    fn parse_fragment(
        &self,
        context: &FragmentContext,
        input: EngineInput<'_>,
        options: ParseOptions,
    ) -> Result<ParsedTree, EngineError> {
        let (text, decoded_as) = self.decode(&input, options)?;
        tracing::debug!("Parsing fragment in <{}> context", context.context_element);

        let context_name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(context.context_element.as_str()),
        );
        let dom = html5ever::parse_fragment(
            RcDom::default(),
            Self::parse_opts(options),
            context_name,
            Vec::new(),
            false,
        )
        .one(text.as_str());
        Self::check_errors(&dom, options)?;

        // html5ever roots fragments in a synthetic <html> element
        let holder = dom.document.children.borrow().first().cloned();
        let mut converter = Converter::new(options);
        if let Some(holder) = holder {
            for child in holder.children.borrow().iter() {
                converter.convert(child, NodeId::ROOT);
            }
        }
        let mut tree = converter.finish();
        if options.contains(ParseOptions::COMPACT) {
            tree.normalize(tree.root());
        }
        Ok(ParsedTree { tree, decoded_as })
    }
}

/// Copies an `RcDom` into a [`DomTree`]
struct Converter {
    options: ParseOptions,
    tree: DomTree,
}

impl Converter {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            tree: DomTree::new(),
        }
    }

    fn finish(self) -> DomTree {
        self.tree
    }

    /// Convert `handle` and everything below it under `parent`. Walks with an
    /// explicit stack; each entry carries whether whitespace is content there.
    fn convert(&mut self, handle: &Handle, parent: NodeId) {
        let mut pending = vec![(handle.clone(), parent, false)];

        while let Some((handle, parent, preserve_space)) = pending.pop() {
            let id = match &handle.data {
                RcNodeData::Document => {
                    let children = handle.children.borrow();
                    pending.extend(children.iter().rev().map(|c| (c.clone(), parent, preserve_space)));
                    continue;
                }
                RcNodeData::Doctype { name, public_id, system_id } => {
                    self.tree.create_doctype(name, public_id, system_id)
                }
                RcNodeData::Text { contents } => {
                    let text = contents.borrow();
                    if self.options.contains(ParseOptions::NO_BLANKS)
                        && !preserve_space
                        && text.chars().all(char::is_whitespace)
                    {
                        continue;
                    }
                    self.tree.create_text(&text)
                }
                RcNodeData::Comment { contents } => self.tree.create_comment(contents),
                RcNodeData::ProcessingInstruction { target, contents } => {
                    self.tree.create_processing_instruction(target, contents)
                }
                RcNodeData::Element { name, attrs, template_contents, .. } => {
                    let mut elem = ElementData::with_namespace(&name.local, &name.ns);
                    elem.attrs = attrs
                        .borrow()
                        .iter()
                        .map(|attr| Attribute {
                            name: match &attr.name.prefix {
                                Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                                None => attr.name.local.to_string(),
                            },
                            value: attr.value.to_string(),
                        })
                        .collect();

                    let keeps_space = preserve_space || matches!(&*name.local, "pre" | "textarea");
                    let id = self.tree.create_element_with(elem);
                    self.tree.append_child(parent, id);

                    let mut children: Vec<Handle> = handle.children.borrow().clone();
                    if let Some(contents) = template_contents.borrow().as_ref() {
                        children.extend(contents.children.borrow().iter().cloned());
                    }
                    pending.extend(children.into_iter().rev().map(|c| (c, id, keeps_space)));
                    continue;
                }
            };
            self.tree.append_child(parent, id);
        }
    }
}

/// Insert the default doctype when the tree has none
fn add_default_doctype(tree: &mut DomTree) {
    let has_doctype = tree
        .children(tree.root())
        .any(|(_, node)| matches!(node.data, NodeData::Doctype { .. }));
    if has_doctype {
        return;
    }
    let doctype = tree.create_doctype("html", DEFAULT_DOCTYPE_PUBLIC_ID, DEFAULT_DOCTYPE_SYSTEM_ID);
    tree.prepend_child(tree.root(), doctype);
}

/// Unwrap html/head/body elements that have no start tag in `source`
fn remove_implied(tree: &mut DomTree, source: &str) {
    let Some(html) = tree.child_element(tree.root(), "html") else {
        return;
    };
    let explicit = explicit_wrappers(source);
    for (name, present) in [("body", explicit.body), ("head", explicit.head)] {
        if present {
            continue;
        }
        if let Some(id) = tree.child_element(html, name) {
            tree.unwrap(id);
        }
    }
    if !explicit.html {
        tree.unwrap(html);
    }
}

/// Which document wrappers have a start tag in the source
#[derive(Debug, Default, PartialEq, Eq)]
struct ExplicitWrappers {
    html: bool,
    head: bool,
    body: bool,
}

/// Token sink recording wrapper start tags. Switches the tokenizer into raw
/// text for elements whose content is never markup.
#[derive(Default)]
struct WrapperScan {
    html: Cell<bool>,
    head: Cell<bool>,
    body: Cell<bool>,
}

impl TokenSink for WrapperScan {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let Token::TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if !matches!(tag.kind, TagKind::StartTag) {
            return TokenSinkResult::Continue;
        }
        match &*tag.name {
            "html" => self.html.set(true),
            "head" => self.head.set(true),
            "body" => self.body.set(true),
            "script" => return TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            "title" | "textarea" => return TokenSinkResult::RawData(RawKind::Rcdata),
            "plaintext" => return TokenSinkResult::Plaintext,
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenize `source` and report which wrappers it opens explicitly. Comments,
/// attribute values and raw text never count.
fn explicit_wrappers(source: &str) -> ExplicitWrappers {
    let tokenizer = Tokenizer::new(WrapperScan::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(source));
    while let TokenizerResult::Script(_) = tokenizer.feed(&input) {}
    tokenizer.end();

    let scan = &tokenizer.sink;
    ExplicitWrappers {
        html: scan.html.get(),
        head: scan.head.get(),
        body: scan.body.get(),
    }
}
