//! Attribute Parsing
//!
//! Parses attributes from the raw content of a start tag (everything after
//! the element name, before `>` or `/>`).

use super::entities::decode_text;
use super::scanner::{is_name_end, is_whitespace};
use memchr::memchr;

/// A parsed attribute with entities decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Split a qualified name into prefix and local name at the colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(colon) => (Some(&name[..colon]), &name[colon + 1..]),
        None => (None, name),
    }
}

/// Parse attributes.
///
/// Strict (XML) mode requires `name="value"` pairs and rejects duplicates.
/// Lenient (HTML) mode also accepts unquoted and valueless attributes and
/// lower-cases names.
pub fn parse_attributes(input: &str, strict: bool) -> Result<Vec<Attribute>, String> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute> = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if bytes[pos] == b'/' && !strict {
            pos += 1;
            continue;
        }

        let name_start = pos;
        while pos < bytes.len() && !is_name_end(bytes[pos]) {
            pos += 1;
        }
        if pos == name_start {
            if strict {
                return Err(format!("Unexpected character in tag: {:?}", &input[pos..]));
            }
            pos += 1;
            continue;
        }
        let name = if strict {
            input[name_start..pos].to_string()
        } else {
            input[name_start..pos].to_ascii_lowercase()
        };

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let value = if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && is_whitespace(bytes[pos]) {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let close = memchr(quote, &bytes[pos + 1..])
                        .ok_or_else(|| format!("Unterminated value for attribute '{name}'"))?;
                    let raw = &input[pos + 1..pos + 1 + close];
                    pos += close + 2;
                    decode_text(raw, strict)?.into_owned()
                }
                Some(_) if !strict => {
                    let start = pos;
                    while pos < bytes.len() && !is_whitespace(bytes[pos]) && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    decode_text(&input[start..pos], false)?.into_owned()
                }
                _ => return Err(format!("Attribute '{name}' value must be quoted")),
            }
        } else if strict {
            return Err(format!("Attribute '{name}' has no value"));
        } else {
            String::new()
        };

        if attrs.iter().any(|a| a.name == name) {
            if strict {
                return Err(format!("Duplicate attribute '{name}'"));
            }
            continue;
        }
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(r#" name="x" string='Label'"#, true).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], Attribute::new("name", "x"));
        assert_eq!(attrs[1], Attribute::new("string", "Label"));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(r#" domain="[('a', '&lt;', 1)]""#, true).unwrap();
        assert_eq!(attrs[0].value, "[('a', '<', 1)]");
    }

    #[test]
    fn test_strict_rejects_duplicates() {
        assert!(parse_attributes(r#" a="1" a="2""#, true).is_err());
    }

    #[test]
    fn test_strict_rejects_unquoted() {
        assert!(parse_attributes(" a=1", true).is_err());
        assert!(parse_attributes(" checked", true).is_err());
    }

    #[test]
    fn test_lenient_html_attributes() {
        let attrs = parse_attributes(" CLASS=btn disabled data-x='y'", false).unwrap();
        assert_eq!(attrs[0], Attribute::new("class", "btn"));
        assert_eq!(attrs[1], Attribute::new("disabled", ""));
        assert_eq!(attrs[2], Attribute::new("data-x", "y"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("t-att-class"), (None, "t-att-class"));
        assert_eq!(split_name("xml:lang"), (Some("xml"), "lang"));
    }
}
