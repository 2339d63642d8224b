//! Engine input views
//!
//! Inputs are borrowed for the duration of one engine call and never copied
//! here. An empty sequence becomes `None`: engines treat "no encoding" and
//! "no URL" differently from any value they are given.

use std::borrow::Cow;

/// Map an empty byte sequence to `None`
#[inline]
pub fn marshal(bytes: &[u8]) -> Option<&[u8]> {
    (!bytes.is_empty()).then_some(bytes)
}

/// Borrowed input handed to a [`ParseEngine`](crate::ParseEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInput<'a> {
    /// Raw markup
    pub content: &'a [u8],
    /// Base URL, absent when the caller gave none
    pub url: Option<&'a [u8]>,
    /// Encoding label, absent when the caller gave none
    pub encoding: Option<&'a [u8]>,
}

impl<'a> EngineInput<'a> {
    pub fn new(content: &'a [u8], url: &'a [u8], encoding: &'a [u8]) -> Self {
        Self {
            content,
            url: marshal(url),
            encoding: marshal(encoding),
        }
    }

    /// URL as text (lossy for invalid UTF-8)
    pub fn url_str(&self) -> Option<Cow<'a, str>> {
        self.url.map(String::from_utf8_lossy)
    }

    /// Encoding label as text (lossy for invalid UTF-8)
    pub fn encoding_label(&self) -> Option<Cow<'a, str>> {
        self.encoding.map(String::from_utf8_lossy)
    }
}
