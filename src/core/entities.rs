//! Entity decoding and markup escaping
//!
//! Handles:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Common HTML named entities (HTML mode only)
//!
//! Uses Cow for zero-copy when nothing needs rewriting.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode entity references in text or attribute content.
///
/// Strict mode (XML) rejects unknown named entities; lenient mode (HTML)
/// also knows the common HTML names and keeps unknown references verbatim.
pub fn decode_text(input: &str, strict: bool) -> Result<Cow<'_, str>, String> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = memchr(b';', rest.as_bytes())
            .filter(|&semi| semi > 1 && semi <= 32)
            .and_then(|semi| decode_entity(&rest[1..semi], strict).map(|c| (c, semi)));

        match decoded {
            Some((text, semi)) => {
                result.push_str(&text);
                rest = &rest[semi + 1..];
            }
            None if strict => {
                let shown: String = rest.chars().take_while(|&c| c != ';').take(16).collect();
                return Err(format!("Undefined entity reference: {shown}"));
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    Ok(Cow::Owned(result))
}

/// Decode a single entity name (without & and ;)
fn decode_entity(entity: &str, strict: bool) -> Option<Cow<'static, str>> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric).map(|c| Cow::Owned(c.to_string()));
    }

    let xml = match entity {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    };
    if xml.is_some() || strict {
        return xml.map(Cow::Borrowed);
    }

    // HTML named entities (common ones)
    let named = match entity {
        "nbsp" => "\u{00A0}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "hellip" => "\u{2026}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        "euro" => "\u{20AC}",
        "times" => "\u{00D7}",
        "middot" => "\u{00B7}",
        "bull" => "\u{2022}",
        _ => return None,
    };
    Some(Cow::Borrowed(named))
}

/// Decode a numeric character reference body (after `#`)
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.parse::<u32>().ok()?,
    };
    if codepoint == 0 {
        return None;
    }
    char::from_u32(codepoint)
}

/// Escape text content: `&`, `<` and `>`
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value for a double-quoted attribute
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    let needs_escape = input
        .bytes()
        .any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\n' | b'\t' | b'\r'));
    if !needs_escape {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        let result = decode_text("hello world", true).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_builtin_entities() {
        let result = decode_text("&lt;a&gt; &amp; &quot;b&quot; &apos;", true).unwrap();
        assert_eq!(result, "<a> & \"b\" '");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_text("&#65;&#x42;", true).unwrap(), "AB");
    }

    #[test]
    fn test_strict_rejects_html_entity() {
        assert!(decode_text("a&nbsp;b", true).is_err());
    }

    #[test]
    fn test_lenient_html_entities() {
        assert_eq!(decode_text("a&nbsp;b&mdash;", false).unwrap(), "a\u{00A0}b\u{2014}");
        assert_eq!(decode_text("AT&T rocks", false).unwrap(), "AT&T rocks");
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("a < b & c"), "a &lt; b &amp; c");
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_attribute() {
        assert_eq!(encode_attribute("say \"hi\"\n"), "say &quot;hi&quot;&#10;");
    }
}
