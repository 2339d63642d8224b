//! Parse entry points
//!
//! Every parse yields a usable [`Document`]. Whether parsing succeeded is
//! reported separately through [`ParseOutcome::error`].

use std::sync::Arc;

use crate::{Config, Document, EngineInput, Html5everEngine, HtmlError, ParseEngine, ParseOptions};

/// A document together with the error that forced a fallback, if any
#[derive(Debug)]
pub struct ParseOutcome {
    /// Always usable; empty when parsing was skipped or failed
    pub document: Document,
    /// `Some(ParseFailed)` when the engine rejected non-empty content
    pub error: Option<HtmlError>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_parts(self) -> (Document, Option<HtmlError>) {
        (self.document, self.error)
    }

    /// The document, or the error if one was reported (the fallback
    /// document is dropped)
    pub fn into_result(self) -> Result<Document, HtmlError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.document),
        }
    }
}

/// HTML parser
pub struct HtmlParser {
    config: Config,
    engine: Arc<dyn ParseEngine>,
}

impl HtmlParser {
    /// Parser with default configuration and the html5ever engine
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            engine: Arc::new(Html5everEngine::new()),
        }
    }

    /// Replace the parsing engine
    pub fn with_engine(mut self, engine: impl ParseEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse with encodings, URL and options taken from the configuration
    pub fn parse_document(&self, content: &[u8]) -> ParseOutcome {
        self.parse(
            content,
            self.config.input_encoding.as_bytes(),
            self.config.base_url.as_bytes(),
            self.config.options,
            self.config.output_encoding.as_bytes(),
        )
    }

    /// Parse without an output buffer
    pub fn parse(
        &self,
        content: &[u8],
        input_encoding: &[u8],
        url: &[u8],
        options: ParseOptions,
        output_encoding: &[u8],
    ) -> ParseOutcome {
        self.parse_with_buffer(content, input_encoding, url, options, output_encoding, None)
    }

    /// Parse `content`. Empty content is not sent to the engine and yields an
    /// empty document without error; rejected content yields an empty
    /// document and `ParseFailed`.
    pub fn parse_with_buffer(
        &self,
        content: &[u8],
        input_encoding: &[u8],
        url: &[u8],
        options: ParseOptions,
        output_encoding: &[u8],
        output_buffer: Option<Vec<u8>>,
    ) -> ParseOutcome {
        tracing::debug!("Parsing HTML document ({} bytes)", content.len());

        if content.is_empty() {
            let document = self
                .create_empty_document(input_encoding, output_encoding, output_buffer)
                .with_source(url, None);
            return ParseOutcome { document, error: None };
        }

        let input = EngineInput::new(content, url, input_encoding);
        match self.engine.parse(input, options) {
            Ok(parsed) => {
                let document = Document::wrap(
                    parsed.tree,
                    content.len(),
                    input_encoding,
                    output_encoding,
                    output_buffer,
                )
                .with_engine(Arc::clone(&self.engine))
                .with_source(url, Some(parsed.decoded_as));
                ParseOutcome { document, error: None }
            }
            Err(err) => {
                tracing::debug!("Falling back to an empty document: {}", err);
                let document = self
                    .create_empty_document(input_encoding, output_encoding, output_buffer)
                    .with_source(url, None);
                ParseOutcome {
                    document,
                    error: Some(HtmlError::ParseFailed(err)),
                }
            }
        }
    }

    /// A document around the engine's empty tree
    pub fn create_empty_document(
        &self,
        input_encoding: &[u8],
        output_encoding: &[u8],
        output_buffer: Option<Vec<u8>>,
    ) -> Document {
        Document::wrap(
            self.engine.create_empty_tree(),
            0,
            input_encoding,
            output_encoding,
            output_buffer,
        )
        .with_engine(Arc::clone(&self.engine))
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}
