//! Meta charset declarations
//!
//! Reads and rewrites the encoding hint a document carries in its own markup:
//! `<meta charset="...">` or
//! `<meta http-equiv="Content-Type" content="text/html; charset=...">`.

use crate::{DomTree, ElementData, Node, NodeId};

/// Failure to write a charset declaration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    #[error("document has no html element to hold a charset declaration")]
    NoInsertionPoint,
}

/// A charset declaration found on a `meta` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `<meta charset="...">`
    Charset(String),
    /// `<meta http-equiv="Content-Type" content="...">`; empty when the
    /// content value names no charset
    ContentType(String),
}

impl Declaration {
    /// The declared charset, if any
    pub fn charset(&self) -> Option<&str> {
        let value = match self {
            Self::Charset(c) | Self::ContentType(c) => c.as_str(),
        };
        (!value.is_empty()).then_some(value)
    }

    /// New value of `attr_name` when the declaration is rewritten to `charset`
    pub(crate) fn rewritten_attr(&self, attr_name: &str, charset: &str) -> Option<String> {
        match self {
            Self::Charset(_) if attr_name.eq_ignore_ascii_case("charset") => Some(charset.to_string()),
            Self::ContentType(_) if attr_name.eq_ignore_ascii_case("content") => {
                Some(content_type_value(charset))
            }
            _ => None,
        }
    }
}

/// The declaration carried by `elem`, if it is a charset-bearing `meta`
pub fn declaration(elem: &ElementData) -> Option<Declaration> {
    if !elem.name.eq_ignore_ascii_case("meta") {
        return None;
    }
    if let Some(charset) = elem.get_attr("charset").map(str::trim) {
        if !charset.is_empty() {
            return Some(Declaration::Charset(charset.to_string()));
        }
    }
    let equiv = elem.get_attr("http-equiv")?;
    if !equiv.trim().eq_ignore_ascii_case("content-type") {
        return None;
    }
    let charset = elem
        .get_attr("content")
        .and_then(extract_charset)
        .unwrap_or_default();
    Some(Declaration::ContentType(charset.to_string()))
}

/// Extract the charset from a content-type value such as
/// `text/html; charset="utf-8"`
pub fn extract_charset(content: &str) -> Option<&str> {
    let bytes = content.as_bytes();
    let mut pos = 0;

    loop {
        let found = find_ignore_case(&bytes[pos..], b"charset")?;
        pos += found + "charset".len();

        let mut cursor = skip_whitespace(bytes, pos);
        if bytes.get(cursor) != Some(&b'=') {
            pos = cursor;
            continue;
        }
        cursor = skip_whitespace(bytes, cursor + 1);

        return match bytes.get(cursor) {
            None => None,
            Some(&quote @ (b'"' | b'\'')) => {
                let start = cursor + 1;
                let len = bytes[start..].iter().position(|&b| b == quote)?;
                Some(&content[start..start + len]).filter(|v| !v.is_empty())
            }
            Some(_) => {
                let len = bytes[cursor..]
                    .iter()
                    .position(|&b| b.is_ascii_whitespace() || b == b';')
                    .unwrap_or(bytes.len() - cursor);
                Some(&content[cursor..cursor + len]).filter(|v| !v.is_empty())
            }
        };
    }
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

fn content_type_value(charset: &str) -> String {
    format!("text/html; charset={charset}")
}

/// Where declarations are read and rewritten: `head` when present, else the
/// whole document
fn search_scope(tree: &DomTree) -> NodeId {
    tree.find_element(tree.root(), "head").unwrap_or(tree.root())
}

fn declarations(tree: &DomTree, scope: NodeId) -> Vec<(NodeId, Declaration)> {
    tree.descendants(scope)
        .filter_map(|(id, node)| node.as_element().and_then(declaration).map(|d| (id, d)))
        .collect()
}

/// Read the charset declared in the document's markup
pub fn read_meta_charset(tree: &DomTree) -> Option<String> {
    declarations(tree, search_scope(tree))
        .into_iter()
        .find_map(|(_, decl)| decl.charset().map(str::to_string))
}

/// Rewrite every declaration [`read_meta_charset`] can see to `encoding`.
/// When there is none, one is inserted as the first child of `head`, which is
/// created under `html` if missing. An empty `encoding` removes the
/// declarations.
///
/// Fails without touching the tree when there is no `html` element.
pub fn write_meta_charset(tree: &mut DomTree, encoding: &str) -> Result<(), MetaError> {
    let html = tree
        .child_element(tree.root(), "html")
        .ok_or(MetaError::NoInsertionPoint)?;
    let encoding = encoding.trim();
    let scope = search_scope(tree);
    let existing = declarations(tree, scope);

    if existing.is_empty() {
        if encoding.is_empty() {
            return Ok(());
        }
        let head = if scope != tree.root() {
            scope
        } else {
            let head = tree.create_element("head");
            tree.prepend_child(html, head);
            head
        };
        let mut elem = ElementData::new("meta");
        elem.set_attr("http-equiv", "Content-Type");
        elem.set_attr("content", content_type_value(encoding));
        let meta = tree.create_element_with(elem);
        tree.prepend_child(head, meta);
        return Ok(());
    }

    for (id, decl) in existing {
        if encoding.is_empty() {
            tree.detach(id);
            continue;
        }
        let Some(elem) = tree.get_mut(id).and_then(Node::as_element_mut) else {
            continue;
        };
        match decl {
            Declaration::Charset(_) => elem.set_attr("charset", encoding),
            Declaration::ContentType(_) => elem.set_attr("content", content_type_value(encoding)),
        }
    }
    tracing::debug!("Rewrote meta charset to {:?}", encoding);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_head() -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        tree.append_child(tree.root(), html);
        tree.append_child(html, head);
        (tree, head)
    }

    fn add_meta(tree: &mut DomTree, head: NodeId, attrs: &[(&str, &str)]) -> NodeId {
        let mut elem = ElementData::new("meta");
        for (name, value) in attrs {
            elem.set_attr(name, *value);
        }
        let id = tree.create_element_with(elem);
        tree.append_child(head, id);
        id
    }

    #[test]
    fn test_extract_charset_forms() {
        assert_eq!(extract_charset("text/html; charset=utf-8"), Some("utf-8"));
        assert_eq!(extract_charset("text/html;CHARSET = \"koi8-r\""), Some("koi8-r"));
        assert_eq!(extract_charset("text/html; charset='latin1'; x=y"), Some("latin1"));
        assert_eq!(extract_charset("text/html; charsetx; charset=big5"), Some("big5"));
        assert_eq!(extract_charset("text/html"), None);
        assert_eq!(extract_charset("charset=\"unterminated"), None);
        assert_eq!(extract_charset("charset="), None);
    }

    #[test]
    fn test_read_charset_attribute() {
        let (mut tree, head) = with_head();
        add_meta(&mut tree, head, &[("charset", " iso-8859-1 ")]);
        assert_eq!(read_meta_charset(&tree).as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn test_read_http_equiv() {
        let (mut tree, head) = with_head();
        add_meta(&mut tree, head, &[("name", "viewport"), ("content", "width=device-width")]);
        add_meta(
            &mut tree,
            head,
            &[("http-equiv", "content-type"), ("content", "text/html; charset=Shift_JIS")],
        );
        assert_eq!(read_meta_charset(&tree).as_deref(), Some("Shift_JIS"));
    }

    #[test]
    fn test_read_none() {
        let (tree, _) = with_head();
        assert_eq!(read_meta_charset(&tree), None);
        assert_eq!(read_meta_charset(&DomTree::new()), None);
    }

    #[test]
    fn test_write_updates_existing() {
        let (mut tree, head) = with_head();
        let meta = add_meta(&mut tree, head, &[("charset", "utf-8")]);
        write_meta_charset(&mut tree, "windows-1252").unwrap();

        assert_eq!(read_meta_charset(&tree).as_deref(), Some("windows-1252"));
        assert_eq!(tree.child_ids(head), vec![meta]);
    }

    #[test]
    fn test_write_inserts_http_equiv() {
        let (mut tree, head) = with_head();
        let title = tree.create_element("title");
        tree.append_child(head, title);

        write_meta_charset(&mut tree, "utf-8").unwrap();
        let first = tree.get(head).unwrap().first_child;
        let elem = tree.get(first).and_then(Node::as_element).unwrap();
        assert_eq!(elem.get_attr("http-equiv"), Some("Content-Type"));
        assert_eq!(elem.get_attr("content"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_write_creates_head() {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        tree.append_child(tree.root(), html);
        tree.append_child(html, body);

        write_meta_charset(&mut tree, "utf-8").unwrap();
        let head = tree.child_element(html, "head").unwrap();
        assert_eq!(tree.child_ids(html), vec![head, body]);
        assert_eq!(read_meta_charset(&tree).as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_write_empty_removes() {
        let (mut tree, head) = with_head();
        add_meta(&mut tree, head, &[("charset", "utf-8")]);
        write_meta_charset(&mut tree, "").unwrap();
        assert!(tree.child_ids(head).is_empty());
    }

    #[test]
    fn test_write_without_html_fails_unchanged() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p);
        let before = tree.len();

        assert_eq!(write_meta_charset(&mut tree, "utf-8"), Err(MetaError::NoInsertionPoint));
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn test_write_rewrites_declaration_outside_head() {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        tree.append_child(tree.root(), html);
        let meta = add_meta(&mut tree, html, &[("charset", "koi8-r")]);

        write_meta_charset(&mut tree, "utf-8").unwrap();
        assert!(tree.child_element(html, "head").is_none());
        assert_eq!(tree.child_ids(html), vec![meta]);
        assert_eq!(read_meta_charset(&tree).as_deref(), Some("utf-8"));
    }
}
