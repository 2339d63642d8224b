//! Comprehensive tests for tessera-html
//!
//! End-to-end parsing, encoding negotiation, meta charset handling and
//! serialization through the public API.

use tessera_html::{
    create_empty_document, parse, parse_with_buffer, Config, EncodingSource, HtmlError, HtmlParser, MetaError,
    ParseOptions,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const LATIN1_PAGE: &[u8] =
    b"<html><head><meta charset=\"iso-8859-1\"><title>Caf\xE9</title></head><body><p>caf\xE9</p></body></html>";

// ============================================================================
// PARSING
// ============================================================================

#[test]
fn test_parse_simple_document() {
    init_tracing();
    let outcome = parse(b"<p>Hello</p>", b"", b"", ParseOptions::DEFAULT, b"utf-8");
    assert!(outcome.is_ok());

    let doc = &outcome.document;
    let tree = doc.tree();
    let html = tree.document_element().unwrap();
    assert!(tree.find_element(html, "head").is_some());
    assert!(tree.find_element(html, "body").is_some());
    assert_eq!(doc.content_len(), 12);
    assert_eq!(doc.output_encoding(), b"utf-8");
}

#[test]
fn test_parse_nested_structure() {
    let html = br#"
        <html>
            <head><title>Test Page</title></head>
            <body>
                <ul>
                    <li>Item 1</li>
                    <li>Item 2</li>
                    <li>Item 3</li>
                </ul>
            </body>
        </html>
    "#;
    let outcome = parse(html, b"", b"", ParseOptions::DEFAULT, b"");
    let doc = outcome.document();
    let tree = doc.tree();
    assert_eq!(tree.elements_by_tag_name(tree.root(), "li").len(), 3);
    assert_eq!(doc.title(), "Test Page");
}

#[test]
fn test_parse_keeps_attributes() {
    let outcome = parse(
        br#"<a href="/x" data-id="7" class="link">go</a>"#,
        b"",
        b"",
        ParseOptions::DEFAULT,
        b"",
    );
    let tree = outcome.document.tree();
    let a = tree.find_element(tree.root(), "a").unwrap();
    let elem = tree.get(a).unwrap().as_element().unwrap();
    assert_eq!(elem.get_attr("href"), Some("/x"));
    assert_eq!(elem.get_attr("data-id"), Some("7"));
    assert_eq!(elem.get_attr("CLASS"), Some("link"));
}

#[test]
fn test_recover_reads_declared_charset() {
    init_tracing();
    let html = b"<html><head><meta charset=\"iso-8859-1\"></head><body>x</body></html>";
    let outcome = parse(html, b"", b"", ParseOptions::RECOVER, b"utf-8");

    assert!(outcome.error.is_none());
    assert_eq!(outcome.document.meta_encoding().as_deref(), Some("iso-8859-1"));
    assert_eq!(outcome.document.output_encoding(), b"utf-8");
}

#[test]
fn test_recover_with_empty_content() {
    let outcome = parse(b"", b"", b"", ParseOptions::RECOVER, b"utf-8");
    assert!(outcome.error.is_none());
    assert!(outcome.document.tree().document_element().is_none());
}

#[test]
fn test_recover_accepts_garbage() {
    let outcome = parse(b"<<<not markup at all>>>", b"", b"", ParseOptions::DEFAULT, b"");
    assert!(outcome.is_ok());
    let tree = outcome.document.tree();
    assert!(tree.document_element().is_some());
    assert!(tree.find_element(tree.root(), "not").is_some());
}

#[test]
fn test_strict_parse_falls_back_to_empty_document() {
    init_tracing();
    let outcome = parse(b"<<<not markup at all>>>", b"", b"", ParseOptions::empty(), b"utf-8");

    assert!(matches!(outcome.error, Some(HtmlError::ParseFailed(_))));
    let doc = &outcome.document;
    assert!(doc.tree().document_element().is_none());
    assert_eq!(doc.content_len(), 0);
    assert_eq!(doc.output_encoding(), b"utf-8");
    assert!(doc.to_html().starts_with("<!DOCTYPE html PUBLIC"));
}

#[test]
fn test_parse_error_message() {
    let outcome = parse(b"<<<not markup at all>>>", b"", b"", ParseOptions::empty(), b"");
    let message = outcome.error.unwrap().to_string();
    assert!(message.starts_with("failed to parse html input"));
}

// ============================================================================
// ENCODING
// ============================================================================

#[test]
fn test_meta_charset_drives_decoding() {
    let outcome = parse(LATIN1_PAGE, b"", b"", ParseOptions::DEFAULT, b"");
    let doc = outcome.document();

    assert_eq!(doc.meta_encoding().as_deref(), Some("iso-8859-1"));
    assert_eq!(doc.title(), "Café");
    let decoded_as = doc.decoded_as().unwrap();
    assert_eq!(decoded_as.source, EncodingSource::MetaPrescan);
    assert_eq!(decoded_as.name(), "windows-1252");
}

#[test]
fn test_explicit_encoding_beats_meta() {
    let html = "<meta charset=\"iso-8859-1\"><p>café</p>";
    let outcome = parse(html.as_bytes(), b"utf-8", b"", ParseOptions::DEFAULT, b"");
    let doc = outcome.document();

    assert_eq!(doc.input_encoding(), b"utf-8");
    assert_eq!(doc.decoded_as().unwrap().source, EncodingSource::Explicit);
    let tree = doc.tree();
    let p = tree.find_element(tree.root(), "p").unwrap();
    assert_eq!(tree.text_content(p), "café");
    // The declaration stays as written
    assert_eq!(doc.meta_encoding().as_deref(), Some("iso-8859-1"));
}

#[test]
fn test_bom_beats_meta() {
    let mut content = vec![0xEF, 0xBB, 0xBF];
    content.extend_from_slice("<meta charset=\"windows-1251\"><p>ü</p>".as_bytes());
    let outcome = parse(&content, b"", b"", ParseOptions::DEFAULT, b"");
    let doc = outcome.document();

    assert_eq!(doc.decoded_as().unwrap().source, EncodingSource::ByteOrderMark);
    assert_eq!(doc.tree().text_content(doc.tree().root()), "ü");
}

#[test]
fn test_ignore_encoding_skips_meta() {
    let options = ParseOptions::DEFAULT | ParseOptions::IGNORE_ENCODING;
    let outcome = parse(LATIN1_PAGE, b"", b"", options, b"");
    let decoded_as = outcome.document.decoded_as().unwrap();
    assert_eq!(decoded_as.source, EncodingSource::Default);
    assert_eq!(decoded_as.name(), "UTF-8");
    assert_eq!(outcome.document.title(), "Caf\u{FFFD}");
}

// ============================================================================
// META ENCODING
// ============================================================================

#[test]
fn test_set_then_get_meta_encoding() {
    let mut outcome = parse(b"<p>x</p>", b"", b"", ParseOptions::DEFAULT, b"");
    assert_eq!(outcome.document.meta_encoding(), None);

    outcome.document.set_meta_encoding("windows-1252").unwrap();
    assert_eq!(outcome.document.meta_encoding().as_deref(), Some("windows-1252"));
    assert!(outcome
        .document
        .to_html()
        .contains(r#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1252">"#));
}

#[test]
fn test_set_meta_encoding_rewrites_existing() {
    let mut outcome = parse(LATIN1_PAGE, b"", b"", ParseOptions::DEFAULT, b"");
    let doc = &mut outcome.document;
    doc.set_meta_encoding("utf-8").unwrap();

    assert_eq!(doc.meta_encoding().as_deref(), Some("utf-8"));
    let tree = doc.tree();
    assert_eq!(tree.elements_by_tag_name(tree.root(), "meta").len(), 1);
}

#[test]
fn test_set_meta_encoding_on_empty_document_fails() {
    let mut doc = create_empty_document(b"", b"", None);
    let before = doc.to_html();

    let err = doc.set_meta_encoding("utf-8").unwrap_err();
    assert_eq!(err, HtmlError::SetMetaEncodingFailed(MetaError::NoInsertionPoint));
    assert_eq!(doc.to_html(), before);
    assert_eq!(doc.meta_encoding(), None);
}

// ============================================================================
// SERIALIZATION
// ============================================================================

#[test]
fn test_serialize_latin1_into_reused_buffer() {
    init_tracing();
    let buffer = Vec::with_capacity(256);
    let outcome = parse_with_buffer(LATIN1_PAGE, b"", b"", ParseOptions::DEFAULT, b"iso-8859-1", Some(buffer));
    let mut doc = outcome.document;

    let bytes = doc.serialize().unwrap().to_vec();
    assert!(bytes.windows(b"caf\xE9".len()).any(|w| w == b"caf\xE9"));
    let needle = b"<meta charset=\"iso-8859-1\">";
    assert!(bytes.windows(needle.len()).any(|w| w == needle));

    let buffer = doc.take_output_buffer().unwrap();
    assert!(buffer.capacity() >= 256);
    assert_eq!(buffer, bytes);
}

#[test]
fn test_serialize_declares_output_encoding() {
    let mut outcome = parse(LATIN1_PAGE, b"", b"", ParseOptions::DEFAULT, b"utf-8");
    let doc = &mut outcome.document;

    let text = String::from_utf8(doc.serialize().unwrap().to_vec()).unwrap();
    assert!(text.contains("<meta charset=\"utf-8\">"));
    assert!(text.contains("café"));
    // The tree still says what the markup said
    assert_eq!(doc.meta_encoding().as_deref(), Some("iso-8859-1"));
}

#[test]
fn test_raw_text_round_trip() {
    let html = b"<xmp>a&b<i></xmp><noembed>1 < 2</noembed>";
    let mut first = parse(html, b"", b"", ParseOptions::DEFAULT, b"utf-8");
    let written = first.document.serialize().unwrap().to_vec();

    let second = parse(&written, b"", b"", ParseOptions::DEFAULT, b"utf-8");
    let tree = second.document.tree();
    let xmp = tree.find_element(tree.root(), "xmp").unwrap();
    assert_eq!(tree.text_content(xmp), "a&b<i>");
    let noembed = tree.find_element(tree.root(), "noembed").unwrap();
    assert_eq!(tree.text_content(noembed), "1 < 2");
    assert_eq!(second.document.to_html(), first.document.to_html());
}

#[test]
fn test_serialize_unmappable_characters() {
    let mut outcome = parse("<p>日本</p>".as_bytes(), b"utf-8", b"", ParseOptions::DEFAULT, b"iso-8859-1");
    let bytes = outcome.document.serialize().unwrap().to_vec();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("&#26085;&#26412;"));
}

// ============================================================================
// FRAGMENTS
// ============================================================================

#[test]
fn test_fragment_grafted_into_document() {
    let mut outcome = parse(br#"<div id="target"></div>"#, b"", b"", ParseOptions::DEFAULT, b"");
    let doc = &mut outcome.document;

    let fragment = doc.parse_fragment(b"<b>x</b>y", b"", ParseOptions::DEFAULT).unwrap();
    assert_eq!(fragment.len(), 2);

    let target = doc.tree().find_element(doc.tree().root(), "div").unwrap();
    let added = doc.append_fragment(target, &fragment);
    assert_eq!(added.len(), 2);
    assert!(doc.to_html().contains(r#"<div id="target"><b>x</b>y</div>"#));
}

#[test]
fn test_fragment_uses_document_encoding() {
    let outcome = parse(b"<p>x</p>", b"windows-1252", b"", ParseOptions::DEFAULT, b"");
    let fragment = outcome
        .document
        .parse_fragment(b"<i>\xE9t\xE9</i>", b"", ParseOptions::DEFAULT)
        .unwrap();
    assert_eq!(fragment.input_encoding(), b"windows-1252");
    assert_eq!(fragment.to_html(), "<i>été</i>");
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_from_json() {
    let config: Config = serde_json::from_str(
        r#"{ "options": 33, "output_encoding": "iso-8859-1", "base_url": "https://example.com/docs/" }"#,
    )
    .unwrap();
    assert_eq!(config.options, ParseOptions::RECOVER | ParseOptions::NO_ERROR);
    assert_eq!(config.input_encoding, "");

    let parser = HtmlParser::with_config(config);
    let outcome = parser.parse_document(br#"<a href="page.html">p</a>"#);
    let doc = outcome.document();
    assert_eq!(doc.output_encoding(), b"iso-8859-1");
    assert_eq!(
        doc.resolve_url("page.html").unwrap().as_str(),
        "https://example.com/docs/page.html"
    );
}

#[test]
fn test_config_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.options, ParseOptions::DEFAULT);
    assert_eq!(config.output_encoding, "utf-8");

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["options"], ParseOptions::DEFAULT.bits());
}
