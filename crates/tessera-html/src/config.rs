//! Parser configuration

use serde::{Deserialize, Serialize};

use crate::encoding::DEFAULT_ENCODING;
use crate::ParseOptions;

/// Defaults used by [`HtmlParser::parse_document`](crate::HtmlParser::parse_document)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parser flags
    pub options: ParseOptions,

    /// Encoding label for input; empty lets the content decide
    pub input_encoding: String,

    /// Encoding label for serialized output
    pub output_encoding: String,

    /// URL documents are parsed from; empty for none
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            options: ParseOptions::DEFAULT,
            input_encoding: String::new(),
            output_encoding: DEFAULT_ENCODING.to_string(),
            base_url: String::new(),
        }
    }
}
