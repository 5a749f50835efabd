//! Utility functions for feed processing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex")
});

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Removes tags, decodes the handful of entities feeds commonly double-escape,
/// and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    let text = MARKUP.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// The `src` of the first `<img>` tag in an HTML fragment.
pub fn extract_img_src(html: &str) -> Option<String> {
    IMG_SRC
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the first recognizable root
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = cleaned[xml_start..].to_string();
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = cleaned[rss_start..].to_string();
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = cleaned[feed_start..].to_string();
    }

    // HTML entities are not defined in XML
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&hellip;", "&#8230;")
        .replace("&amp;amp;", "&amp;");

    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}

/// Decompresses a response body that the HTTP client left encoded. Brotli is
/// tried when the server announced it, then gzip, zlib and raw deflate; the
/// original bytes are returned when nothing applies.
pub fn decompress_body(bytes: &[u8], content_encoding: Option<&str>, feed_url: &str) -> Vec<u8> {
    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed brotli content from {}", feed_url);
            return decoded;
        }
        debug!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}, trying other methods", feed_url);
    }
    try_decompressions(bytes, feed_url)
}

/// Try various decompression methods for a byte array
pub fn try_decompressions(bytes: &[u8], feed_url: &str) -> Vec<u8> {
    let mut decoded = Vec::new();
    if flate2::read::GzDecoder::new(bytes)
        .read_to_end(&mut decoded)
        .is_ok()
        && !decoded.is_empty()
    {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed gzip content from {}", feed_url);
        return decoded;
    }

    let mut decoded = Vec::new();
    if flate2::read::ZlibDecoder::new(bytes)
        .read_to_end(&mut decoded)
        .is_ok()
        && !decoded.is_empty()
    {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed zlib content from {}", feed_url);
        return decoded;
    }

    // Plain text is rarely valid raw deflate, but only trust output that is
    // not the input itself.
    if !looks_like_text(bytes) {
        let mut decoded = Vec::new();
        if flate2::read::DeflateDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .is_ok()
            && !decoded.is_empty()
        {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed deflate content from {}", feed_url);
            return decoded;
        }
    }

    bytes.to_vec()
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &bytes[i..])
        .unwrap_or(bytes);
    start.starts_with(b"<") || start.starts_with(b"\xEF\xBB\xBF") || start.starts_with(b"{")
}

/// Decodes a body as UTF-8, falling back to the charset announced in the
/// content type and finally to Windows-1252.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let encoding = content_type
        .and_then(|ct| ct.split("charset=").nth(1))
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.trim().trim_matches('"').as_bytes()))
        .unwrap_or(encoding_rs::WINDOWS_1252);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://www.vox.com/rss/index.xml"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("ftp://example.com/feed"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Wages <b>rise</b>&nbsp;again</p>\n\n<br/>in &amp; out"),
            "Wages rise again in & out"
        );
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_extract_img_src() {
        let html = r#"<p>Text</p><img class="x" src='https://cdn.example.com/a.jpg' /><img src="b.jpg">"#;
        assert_eq!(
            extract_img_src(html),
            Some("https://cdn.example.com/a.jpg".to_string())
        );
        assert_eq!(extract_img_src("<p>No image</p>"), None);
    }

    #[test]
    fn test_cleanup_xml() {
        let cleaned = cleanup_xml("\u{FEFF}  junk<rss><item>A&nbsp;B</item></rss>");
        assert!(cleaned.starts_with("<?xml"));
        assert!(cleaned.contains("<rss><item>A&#160;B</item></rss>"));
        assert!(!cleaned.contains("junk"));
    }

    #[test]
    fn test_gzip_body_is_decompressed() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<rss></rss>").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decompress_body(&compressed, None, "test"), b"<rss></rss>");
        assert_eq!(decompress_body(b"<rss></rss>", None, "test"), b"<rss></rss>");
    }

    #[test]
    fn test_decode_body_falls_back_to_charset() {
        assert_eq!(decode_body("caf\u{e9}".as_bytes(), None), "caf\u{e9}");
        assert_eq!(
            decode_body(b"caf\xe9", Some("text/xml; charset=ISO-8859-1")),
            "caf\u{e9}"
        );
        assert_eq!(decode_body(b"caf\xe9", None), "caf\u{e9}");
    }
}
