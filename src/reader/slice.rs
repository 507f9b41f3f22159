//! Slice Reader
//!
//! Parses markup from a string slice. Names, comments and CDATA borrow from
//! the input; text and attribute values borrow unless entities had to be
//! decoded.

use super::events::{StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::entities::decode_text;
use crate::core::scanner::{is_name_end, is_whitespace, Scanner};
use std::borrow::Cow;

/// HTML elements that never have content or an end tag
pub const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// HTML elements whose content is raw text up to the matching end tag
const HTML_RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Pull reader over a string slice
pub struct SliceReader<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    raw_text_until: Option<String>,
}

impl<'a> SliceReader<'a> {
    /// Create a strict XML reader
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            scanner: Scanner::new(input),
            strict: true,
            raw_text_until: None,
        }
    }

    /// Create a lenient HTML reader
    pub fn new_html(input: &'a str) -> Self {
        SliceReader {
            scanner: Scanner::new(input),
            strict: false,
            raw_text_until: None,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Get the next event, `None` at end of input
    pub fn next_event(&mut self) -> Option<Result<XmlEvent<'a>, String>> {
        if self.scanner.is_eof() {
            return None;
        }
        if let Some(tag) = self.raw_text_until.take() {
            if let Some(event) = self.read_raw_text(&tag) {
                return Some(Ok(event));
            }
        }
        if self.scanner.peek() != Some(b'<') {
            return Some(self.read_text());
        }
        Some(self.read_markup())
    }

    fn read_text(&mut self) -> Result<XmlEvent<'a>, String> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(start + self.scanner.remaining().len());
        self.scanner.set_position(end);
        let raw = self.scanner.slice(start, end);
        Ok(XmlEvent::Text(decode_text(raw, self.strict)?))
    }

    /// Content of `<script>`/`<style>` up to the closing tag, undecoded
    fn read_raw_text(&mut self, tag: &str) -> Option<XmlEvent<'a>> {
        let start = self.scanner.position();
        let rest = self.scanner.remaining();
        let lower = rest.to_ascii_lowercase();
        let closing = format!("</{tag}");
        let end = lower.find(&closing).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.scanner.set_position(start + end);
        Some(XmlEvent::Text(Cow::Borrowed(self.scanner.slice(start, start + end))))
    }

    fn read_markup(&mut self) -> Result<XmlEvent<'a>, String> {
        let start = self.scanner.position();

        if self.scanner.starts_with("<!--") {
            let end = self
                .scanner
                .find_str("-->")
                .ok_or_else(|| format!("Unterminated comment at offset {start}"))?;
            self.scanner.set_position(end + 3);
            return Ok(XmlEvent::Comment(self.scanner.slice(start + 4, end)));
        }

        if self.scanner.starts_with("<![CDATA[") {
            let end = self
                .scanner
                .find_str("]]>")
                .ok_or_else(|| format!("Unterminated CDATA section at offset {start}"))?;
            self.scanner.set_position(end + 3);
            return Ok(XmlEvent::CData(self.scanner.slice(start + 9, end)));
        }

        if self.scanner.starts_with_ignore_case("<!DOCTYPE") {
            let end = self
                .scanner
                .find_tag_end_quoted()
                .ok_or_else(|| format!("Unterminated DOCTYPE at offset {start}"))?;
            // internal subset: <!DOCTYPE x [ ... ]>
            let end = match self.scanner.slice(start, end).find('[') {
                Some(_) => self
                    .scanner
                    .find_str("]>")
                    .map(|i| i + 1)
                    .ok_or_else(|| format!("Unterminated DOCTYPE at offset {start}"))?,
                None => end,
            };
            self.scanner.set_position(end + 1);
            return Ok(XmlEvent::DocType(self.scanner.slice(start + 9, end).trim()));
        }

        if self.scanner.starts_with("<?") {
            let end = self
                .scanner
                .find_str("?>")
                .ok_or_else(|| format!("Unterminated processing instruction at offset {start}"))?;
            self.scanner.set_position(end + 2);
            let body = self.scanner.slice(start + 2, end);
            let split = body.bytes().position(is_whitespace).unwrap_or(body.len());
            let target = &body[..split];
            if target.eq_ignore_ascii_case("xml") {
                return Ok(XmlEvent::XmlDeclaration);
            }
            return Ok(XmlEvent::ProcessingInstruction {
                target,
                data: body[split..].trim_start(),
            });
        }

        if self.scanner.starts_with("</") {
            let end = self
                .scanner
                .find_byte(b'>')
                .ok_or_else(|| format!("Unterminated end tag at offset {start}"))?;
            self.scanner.set_position(end + 1);
            let name = self.scanner.slice(start + 2, end).trim();
            if name.is_empty() {
                return Err(format!("Empty end tag at offset {start}"));
            }
            return Ok(XmlEvent::EndElement(self.element_name(name)));
        }

        let starts_name = self
            .scanner
            .peek_at(1)
            .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80);
        if !starts_name {
            if self.strict {
                return Err(format!("Invalid tag start at offset {start}"));
            }
            // stray '<' in HTML text
            self.scanner.advance(1);
            let mut event = self.read_text()?;
            if let XmlEvent::Text(text) = &mut event {
                *text = Cow::Owned(format!("<{text}"));
            }
            return Ok(event);
        }

        self.read_start_tag(start)
    }

    fn read_start_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, String> {
        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| format!("Unterminated start tag at offset {start}"))?;
        self.scanner.set_position(end + 1);

        let mut content = self.scanner.slice(start + 1, end);
        let self_closing = content.ends_with('/');
        if self_closing {
            content = &content[..content.len() - 1];
        }

        let name_len = content.bytes().position(is_name_end).unwrap_or(content.len());
        let name = self.element_name(&content[..name_len]);
        let attributes = parse_attributes(&content[name_len..], self.strict)?;
        let element = StartElement::new(name, attributes);

        if self_closing {
            return Ok(XmlEvent::EmptyElement(element));
        }
        if !self.strict {
            if HTML_VOID_ELEMENTS.contains(&element.name.as_ref()) {
                return Ok(XmlEvent::EmptyElement(element));
            }
            if HTML_RAW_TEXT_ELEMENTS.contains(&element.name.as_ref()) {
                self.raw_text_until = Some(element.name.to_string());
            }
        }
        Ok(XmlEvent::StartElement(element))
    }

    fn element_name(&self, name: &'a str) -> Cow<'a, str> {
        if self.strict || !name.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(name.to_ascii_lowercase())
        }
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
