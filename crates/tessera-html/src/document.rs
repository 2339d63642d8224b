//! Document - parsed tree plus its encoding metadata
//!
//! A `Document` owns its tree outright and is always usable: it wraps either
//! an engine-produced tree or an engine-created empty one.

use std::fmt;
use std::sync::Arc;

use tessera_dom::{DomTree, HtmlSerializer, NodeId};
use url::Url;

use crate::encoding::{self, DecodedAs, DEFAULT_ENCODING};
use crate::fragment::{self, Fragment, FragmentContext};
use crate::{Html5everEngine, HtmlError, ParseEngine, ParseOptions};

/// HTML Document
pub struct Document {
    tree: DomTree,
    content_len: usize,
    input_encoding: Vec<u8>,
    output_encoding: Vec<u8>,
    output_buffer: Option<Vec<u8>>,
    url: String,
    decoded_as: Option<DecodedAs>,
    engine: Arc<dyn ParseEngine>,
}

impl Document {
    /// Wrap an already-built tree. Does not parse.
    pub fn wrap(
        tree: DomTree,
        content_len: usize,
        input_encoding: &[u8],
        output_encoding: &[u8],
        output_buffer: Option<Vec<u8>>,
    ) -> Self {
        Self {
            tree,
            content_len,
            input_encoding: input_encoding.to_vec(),
            output_encoding: output_encoding.to_vec(),
            output_buffer,
            url: String::new(),
            decoded_as: None,
            engine: Arc::new(Html5everEngine),
        }
    }

    pub(crate) fn with_engine(mut self, engine: Arc<dyn ParseEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub(crate) fn with_source(mut self, url: &[u8], decoded_as: Option<DecodedAs>) -> Self {
        self.url = String::from_utf8_lossy(url).into_owned();
        self.decoded_as = decoded_as;
        self
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Length of the content this document was parsed from
    pub fn content_len(&self) -> usize {
        self.content_len
    }

    /// Input encoding as given by the caller; empty when unspecified
    pub fn input_encoding(&self) -> &[u8] {
        &self.input_encoding
    }

    /// Output encoding as given by the caller; empty means UTF-8
    pub fn output_encoding(&self) -> &[u8] {
        &self.output_encoding
    }

    pub fn set_output_encoding(&mut self, encoding: &[u8]) {
        self.output_encoding = encoding.to_vec();
    }

    pub fn output_buffer(&self) -> Option<&[u8]> {
        self.output_buffer.as_deref()
    }

    /// Hand the output buffer back to the caller
    pub fn take_output_buffer(&mut self) -> Option<Vec<u8>> {
        self.output_buffer.take()
    }

    /// How the content was decoded; `None` when nothing was parsed
    pub fn decoded_as(&self) -> Option<DecodedAs> {
        self.decoded_as
    }

    /// Document URL as given; `None` when empty
    pub fn url(&self) -> Option<&str> {
        (!self.url.is_empty()).then_some(self.url.as_str())
    }

    /// Document URL, if it parses as an absolute URL
    pub fn base_url(&self) -> Option<Url> {
        self.url().and_then(|url| Url::parse(url).ok())
    }

    /// Resolve a reference against the document URL
    pub fn resolve_url(&self, href: &str) -> Option<Url> {
        match self.base_url() {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        }
    }

    /// Text of the first `<title>`
    pub fn title(&self) -> String {
        self.tree
            .find_element(self.tree.root(), "title")
            .map(|id| self.tree.text_content(id).trim().to_string())
            .unwrap_or_default()
    }

    /// Charset declared in the markup, if any
    pub fn meta_encoding(&self) -> Option<String> {
        self.engine.read_meta_charset(&self.tree)
    }

    /// Rewrite (or insert) the charset declaration. An empty `encoding`
    /// removes existing declarations.
    pub fn set_meta_encoding(&mut self, encoding: &str) -> Result<(), HtmlError> {
        self.engine
            .write_meta_charset(&mut self.tree, encoding)
            .map_err(HtmlError::SetMetaEncodingFailed)
    }

    /// Parse `input` as `<body>` content of this document, decoded with this
    /// document's input encoding
    pub fn parse_fragment(&self, input: &[u8], url: &[u8], options: ParseOptions) -> Result<Fragment, HtmlError> {
        self.parse_fragment_in(&FragmentContext::default(), input, url, options)
    }

    /// Parse `input` as the content of `context`
    pub fn parse_fragment_in(
        &self,
        context: &FragmentContext,
        input: &[u8],
        url: &[u8],
        options: ParseOptions,
    ) -> Result<Fragment, HtmlError> {
        fragment::parse_fragment(self.engine.as_ref(), context, input, &self.input_encoding, url, options)
    }

    /// Copy a fragment's nodes under `parent`, returning the new node IDs
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &Fragment) -> Vec<NodeId> {
        if self.tree.get(parent).is_none() {
            return Vec::new();
        }
        fragment
            .nodes()
            .into_iter()
            .map(|node| {
                let id = self.tree.import(fragment.tree(), node);
                self.tree.append_child(parent, id);
                id
            })
            .collect()
    }

    /// Serialize as UTF-8 text, declarations untouched
    pub fn to_html(&self) -> String {
        HtmlSerializer::new().serialize_document(&self.tree)
    }

    /// Markup of the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        HtmlSerializer::new().serialize_inner(&self.tree, node)
    }

    /// Markup of `node` itself, children included
    pub fn outer_html(&self, node: NodeId) -> String {
        HtmlSerializer::new().serialize_outer(&self.tree, node)
    }

    /// Serialize in the output encoding into the output buffer, which is
    /// created on first use and reused afterwards. Charset declarations in
    /// the output name the output encoding; the tree itself is not modified.
    pub fn serialize(&mut self) -> Result<&[u8], HtmlError> {
        let encoding = encoding::output_encoding(&self.output_encoding).ok_or_else(|| {
            HtmlError::UnknownEncoding(String::from_utf8_lossy(&self.output_encoding).into_owned())
        })?;
        let label = match String::from_utf8_lossy(&self.output_encoding).trim() {
            "" => DEFAULT_ENCODING.to_string(),
            label => label.to_string(),
        };

        let html = HtmlSerializer::new().with_charset(label).serialize_document(&self.tree);
        let (bytes, _, unmappable) = encoding.encode(&html);
        if unmappable {
            tracing::debug!("Wrote character references for characters outside {}", encoding.name());
        }

        let buffer = self.output_buffer.get_or_insert_with(Vec::new);
        buffer.clear();
        buffer.extend_from_slice(&bytes);
        Ok(buffer.as_slice())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.node_count())
            .field("content_len", &self.content_len)
            .field("input_encoding", &String::from_utf8_lossy(&self.input_encoding))
            .field("output_encoding", &String::from_utf8_lossy(&self.output_encoding))
            .field("url", &self.url)
            .field("decoded_as", &self.decoded_as)
            .finish_non_exhaustive()
    }
}
