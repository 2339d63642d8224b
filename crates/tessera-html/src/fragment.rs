//! Fragment parsing
//!
//! Parses markup as the content of an element of an existing document, using
//! that document's input encoding. Unlike full documents there is no fallback:
//! a rejected fragment is an error and nothing else.

use tessera_dom::{DomTree, HtmlSerializer, NodeId};

use crate::encoding::DecodedAs;
use crate::{EngineInput, HtmlError, ParseEngine, ParseOptions};

/// Element a fragment is parsed inside of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentContext {
    pub context_element: String,
}

impl FragmentContext {
    pub fn new(context_element: &str) -> Self {
        Self {
            context_element: context_element.to_ascii_lowercase(),
        }
    }
}

impl Default for FragmentContext {
    fn default() -> Self {
        Self::new("body")
    }
}

/// A parsed sub-tree. The document node of [`Fragment::tree`] holds the
/// fragment's top-level nodes.
#[derive(Debug, Clone)]
pub struct Fragment {
    tree: DomTree,
    input_encoding: Vec<u8>,
    url: String,
    decoded_as: Option<DecodedAs>,
}

impl Fragment {
    /// Top-level nodes in order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.tree.child_ids(self.tree.root())
    }

    /// Number of top-level nodes
    pub fn len(&self) -> usize {
        self.tree.children(self.tree.root()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn into_tree(self) -> DomTree {
        self.tree
    }

    /// Encoding label inherited from the originating document
    pub fn input_encoding(&self) -> &[u8] {
        &self.input_encoding
    }

    pub fn url(&self) -> Option<&str> {
        (!self.url.is_empty()).then_some(self.url.as_str())
    }

    /// Encoding the fragment was decoded with; `None` for empty input
    pub fn decoded_as(&self) -> Option<DecodedAs> {
        self.decoded_as
    }

    pub fn to_html(&self) -> String {
        HtmlSerializer::new().serialize_document(&self.tree)
    }
}

/// Parse `input` inside `context` with `engine`
pub fn parse_fragment(
    engine: &dyn ParseEngine,
    context: &FragmentContext,
    input: &[u8],
    input_encoding: &[u8],
    url: &[u8],
    options: ParseOptions,
) -> Result<Fragment, HtmlError> {
    let url_text = String::from_utf8_lossy(url).into_owned();

    if input.is_empty() {
        return Ok(Fragment {
            tree: DomTree::new(),
            input_encoding: input_encoding.to_vec(),
            url: url_text,
            decoded_as: None,
        });
    }

    let parsed = engine
        .parse_fragment(context, EngineInput::new(input, url, input_encoding), options)
        .map_err(|err| {
            tracing::debug!("Fragment rejected: {}", err);
            HtmlError::FragmentParseFailed(err)
        })?;

    Ok(Fragment {
        tree: parsed.tree,
        input_encoding: input_encoding.to_vec(),
        url: url_text,
        decoded_as: Some(parsed.decoded_as),
    })
}
