//! Encoding negotiation
//!
//! Decides which encoding decodes the raw content. Precedence:
//! 1. the label the caller passed in,
//! 2. a byte order mark,
//! 3. a `<meta>` declaration found by prescanning the first bytes
//!    (skipped with [`ParseOptions::IGNORE_ENCODING`]),
//! 4. UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use tessera_dom::meta::extract_charset;

use crate::{EngineError, ParseOptions};

/// Encoding assumed when nothing else is known
pub const DEFAULT_ENCODING: &str = "utf-8";

/// How many bytes the meta prescan looks at
const PRESCAN_LIMIT: usize = 1024;

/// Where the decoding encoding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Explicit,
    ByteOrderMark,
    MetaPrescan,
    Default,
}

/// The encoding used to decode a document and its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAs {
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
}

impl DecodedAs {
    /// Canonical encoding name, e.g. `windows-1252`
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Look up an encoding by WHATWG label
pub fn for_label(label: &[u8]) -> Option<&'static Encoding> {
    Encoding::for_label(label)
}

/// Choose the decoding encoding for `content`
pub fn resolve(
    declared: Option<&[u8]>,
    content: &[u8],
    options: ParseOptions,
) -> Result<DecodedAs, EngineError> {
    if let Some(label) = declared {
        return for_label(label)
            .map(|encoding| DecodedAs {
                encoding,
                source: EncodingSource::Explicit,
            })
            .ok_or_else(|| EngineError::UnknownEncoding(String::from_utf8_lossy(label).into_owned()));
    }

    if let Some((encoding, _)) = Encoding::for_bom(content) {
        return Ok(DecodedAs {
            encoding,
            source: EncodingSource::ByteOrderMark,
        });
    }

    if !options.contains(ParseOptions::IGNORE_ENCODING) {
        if let Some(encoding) = prescan(content) {
            return Ok(DecodedAs {
                encoding,
                source: EncodingSource::MetaPrescan,
            });
        }
    }

    Ok(DecodedAs {
        encoding: UTF_8,
        source: EncodingSource::Default,
    })
}

/// Decode `content`, returning the text and whether malformed sequences
/// were replaced
pub fn decode(content: &[u8], decoded_as: DecodedAs) -> (Cow<'_, str>, bool) {
    let encoding = decoded_as.encoding;
    match decoded_as.source {
        EncodingSource::ByteOrderMark => {
            let bom_len = Encoding::for_bom(content).map_or(0, |(_, len)| len);
            encoding.decode_without_bom_handling(&content[bom_len..])
        }
        _ => encoding.decode_with_bom_removal(content),
    }
}

/// Encoding used to write output for `label`; empty means UTF-8
pub fn output_encoding(label: &[u8]) -> Option<&'static Encoding> {
    if label.is_empty() {
        return Some(UTF_8);
    }
    for_label(label).map(Encoding::output_encoding)
}

/// Find a charset declared by a `<meta>` tag near the start of `content`
pub fn prescan(content: &[u8]) -> Option<&'static Encoding> {
    let head = &content[..content.len().min(PRESCAN_LIMIT)];
    let mut pos = 0;

    while pos < head.len() {
        let rest = &head[pos..];
        if rest.starts_with(b"<!--") {
            pos += find(&rest[4..], b"-->").map_or(rest.len(), |end| end + 4 + 3);
            continue;
        }
        if starts_with_ignore_case(rest, b"<meta")
            && rest.get(5).is_some_and(|&b| b.is_ascii_whitespace() || b == b'/')
        {
            let end = rest.iter().position(|&b| b == b'>').unwrap_or(rest.len());
            if let Some(encoding) = meta_tag_encoding(&rest[5..end]) {
                return Some(encoding);
            }
            pos += end.max(1);
            continue;
        }
        pos += 1;
    }
    None
}

/// Charset named by the attributes of one `<meta` tag
fn meta_tag_encoding(attrs: &[u8]) -> Option<&'static Encoding> {
    let mut seen: Vec<String> = Vec::new();
    let mut got_pragma = false;
    let mut need_pragma = None;
    let mut charset = None;

    for (name, value) in attributes(attrs) {
        if seen.contains(&name) {
            continue;
        }
        match name.as_str() {
            "http-equiv" if value.trim().eq_ignore_ascii_case("content-type") => got_pragma = true,
            "content" if charset.is_none() => {
                if let Some(label) = extract_charset(&value) {
                    charset = for_label(label.as_bytes());
                    need_pragma = Some(true);
                }
            }
            "charset" => {
                charset = for_label(value.as_bytes());
                need_pragma = Some(false);
            }
            _ => {}
        }
        seen.push(name);
    }

    let encoding = match need_pragma {
        None => return None,
        Some(true) if !got_pragma => return None,
        _ => charset?,
    };
    // A document read far enough to find this tag is ASCII-compatible
    if encoding == UTF_16LE || encoding == UTF_16BE {
        Some(UTF_8)
    } else {
        Some(encoding)
    }
}

/// Lowercased (name, value) pairs of a tag's attribute section
fn attributes(bytes: &[u8]) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        while bytes
            .get(pos)
            .is_some_and(|&b| b.is_ascii_whitespace() || b == b'/')
        {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let start = pos;
        while bytes
            .get(pos)
            .is_some_and(|&b| !b.is_ascii_whitespace() && b != b'=' && b != b'/')
        {
            pos += 1;
        }
        let name = String::from_utf8_lossy(&bytes[start..pos]).to_ascii_lowercase();

        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attrs.push((name, String::new()));
            continue;
        }
        pos += 1;
        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }

        let value = match bytes.get(pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                let start = pos + 1;
                let len = bytes[start..]
                    .iter()
                    .position(|&b| b == quote)
                    .unwrap_or(bytes.len() - start);
                pos = (start + len + 1).min(bytes.len());
                &bytes[start..start + len]
            }
            _ => {
                let start = pos;
                while bytes.get(pos).is_some_and(|&b| !b.is_ascii_whitespace()) {
                    pos += 1;
                }
                &bytes[start..pos]
            }
        };
        attrs.push((name, String::from_utf8_lossy(value).into_owned()));
    }
    attrs
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, UTF_16LE, WINDOWS_1252};

    #[test]
    fn test_explicit_label_wins() {
        let content = b"<meta charset=\"shift_jis\">";
        let resolved = resolve(Some(b"latin1"), content, ParseOptions::DEFAULT).unwrap();
        assert_eq!(resolved.encoding, WINDOWS_1252);
        assert_eq!(resolved.source, EncodingSource::Explicit);
    }

    #[test]
    fn test_unknown_label() {
        let err = resolve(Some(b"no-such-charset"), b"x", ParseOptions::DEFAULT).unwrap_err();
        assert_eq!(err, EngineError::UnknownEncoding("no-such-charset".into()));
    }

    #[test]
    fn test_bom_beats_meta() {
        let mut content = vec![0xEF, 0xBB, 0xBF];
        content.extend_from_slice(b"<meta charset=\"shift_jis\">");
        let resolved = resolve(None, &content, ParseOptions::DEFAULT).unwrap();
        assert_eq!(resolved.encoding, UTF_8);
        assert_eq!(resolved.source, EncodingSource::ByteOrderMark);

        let (text, had_errors) = decode(&content, resolved);
        assert!(!had_errors);
        assert!(text.starts_with("<meta"));
    }

    #[test]
    fn test_meta_prescan() {
        let content = b"<html><head><META Charset='Shift_JIS'></head></html>";
        let resolved = resolve(None, content, ParseOptions::DEFAULT).unwrap();
        assert_eq!(resolved.encoding, SHIFT_JIS);
        assert_eq!(resolved.source, EncodingSource::MetaPrescan);
    }

    #[test]
    fn test_ignore_encoding_skips_prescan() {
        let content = b"<meta charset=\"shift_jis\">";
        let options = ParseOptions::DEFAULT | ParseOptions::IGNORE_ENCODING;
        let resolved = resolve(None, content, options).unwrap();
        assert_eq!(resolved.source, EncodingSource::Default);
        assert_eq!(resolved.encoding, UTF_8);
    }

    #[test]
    fn test_prescan_http_equiv_needs_pragma() {
        let with_pragma =
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\">";
        assert_eq!(prescan(with_pragma), Some(WINDOWS_1252));

        let without_pragma = b"<meta content=\"text/html; charset=windows-1252\">";
        assert_eq!(prescan(without_pragma), None);
    }

    #[test]
    fn test_prescan_skips_comments() {
        let content = b"<!-- <meta charset=\"shift_jis\"> --><meta charset=\"latin1\">";
        assert_eq!(prescan(content), Some(WINDOWS_1252));
    }

    #[test]
    fn test_prescan_utf16_label_means_utf8() {
        assert_eq!(prescan(b"<meta charset=\"utf-16le\">"), Some(UTF_8));
        assert_ne!(prescan(b"<meta charset=\"utf-16le\">"), Some(UTF_16LE));
    }

    #[test]
    fn test_prescan_limit() {
        let mut content = vec![b' '; PRESCAN_LIMIT];
        content.extend_from_slice(b"<meta charset=\"shift_jis\">");
        assert_eq!(prescan(&content), None);
    }

    #[test]
    fn test_decode_reports_replacement() {
        let resolved = DecodedAs {
            encoding: UTF_8,
            source: EncodingSource::Default,
        };
        let (text, had_errors) = decode(b"caf\xE9", resolved);
        assert!(had_errors);
        assert_eq!(text, "caf\u{FFFD}");
    }

    #[test]
    fn test_output_encoding() {
        assert_eq!(output_encoding(b""), Some(UTF_8));
        assert_eq!(output_encoding(b"ISO-8859-1"), Some(WINDOWS_1252));
        assert_eq!(output_encoding(b"utf-16"), Some(UTF_8));
        assert_eq!(output_encoding(b"bogus"), None);
    }
}
