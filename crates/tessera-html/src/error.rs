//! Error types

use tessera_dom::MetaError;

/// Errors reported to callers of the document API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HtmlError {
    /// The engine rejected non-empty content. The caller still receives an
    /// empty fallback document.
    #[error("failed to parse html input: {0}")]
    ParseFailed(#[source] EngineError),

    #[error("set meta encoding failed: {0}")]
    SetMetaEncodingFailed(#[source] MetaError),

    #[error("failed to parse html fragment: {0}")]
    FragmentParseFailed(#[source] EngineError),

    #[error("unknown output encoding: {0}")]
    UnknownEncoding(String),
}

/// Why a parse engine refused to produce a tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("input is not valid {encoding}")]
    Malformed { encoding: &'static str },

    #[error("{errors} parse error(s), first: {first}")]
    Rejected { errors: usize, first: String },
}
