//! Tessera HTML
//!
//! Encoding-aware HTML document parsing built on html5ever.
//!
//! Parsing never leaves the caller without a document: content the engine
//! rejects yields an empty fallback document alongside
//! [`HtmlError::ParseFailed`], and empty content yields an empty document
//! with no error at all.
//!
//! ```no_run
//! use tessera_html::{parse, ParseOptions};
//!
//! let outcome = parse(b"<p>Hello</p>", b"", b"", ParseOptions::DEFAULT, b"utf-8");
//! assert!(outcome.is_ok());
//! println!("{}", outcome.document.to_html());
//! ```

mod buffer;
mod config;
mod document;
pub mod encoding;
mod engine;
mod error;
mod fragment;
mod options;
mod parser;

pub use buffer::{marshal, EngineInput};
pub use config::Config;
pub use document::Document;
pub use encoding::{DecodedAs, EncodingSource, DEFAULT_ENCODING};
pub use engine::{
    empty_tree, Html5everEngine, ParseEngine, ParsedTree, DEFAULT_DOCTYPE_PUBLIC_ID, DEFAULT_DOCTYPE_SYSTEM_ID,
};
pub use error::{EngineError, HtmlError};
pub use fragment::{parse_fragment, Fragment, FragmentContext};
pub use options::ParseOptions;
pub use parser::{HtmlParser, ParseOutcome};

pub use tessera_dom::{DomTree, HtmlSerializer, MetaError, Node, NodeData, NodeId};

/// Parse with the default engine
pub fn parse(
    content: &[u8],
    input_encoding: &[u8],
    url: &[u8],
    options: ParseOptions,
    output_encoding: &[u8],
) -> ParseOutcome {
    HtmlParser::new().parse(content, input_encoding, url, options, output_encoding)
}

/// Parse with the default engine, keeping `output_buffer` for serialization
pub fn parse_with_buffer(
    content: &[u8],
    input_encoding: &[u8],
    url: &[u8],
    options: ParseOptions,
    output_encoding: &[u8],
    output_buffer: Option<Vec<u8>>,
) -> ParseOutcome {
    HtmlParser::new().parse_with_buffer(content, input_encoding, url, options, output_encoding, output_buffer)
}

/// Empty document from the default engine
pub fn create_empty_document(input_encoding: &[u8], output_encoding: &[u8], output_buffer: Option<Vec<u8>>) -> Document {
    HtmlParser::new().create_empty_document(input_encoding, output_encoding, output_buffer)
}
