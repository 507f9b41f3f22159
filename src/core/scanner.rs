//! Delimiter scanning over markup using memchr
//!
//! All delimiters searched for are ASCII, so every position returned is a
//! valid `str` boundary of the underlying text.

use memchr::{memchr, memchr2, memmem};

/// Cursor over markup text
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Remaining text from the cursor
    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Slice of the input between two byte offsets
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Case-insensitive ASCII prefix check (for `<!DOCTYPE` and friends)
    pub fn starts_with_ignore_case(&self, needle: &str) -> bool {
        let rest = self.remaining().as_bytes();
        rest.len() >= needle.len() && rest[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
    }

    /// Find next '<' (tag start)
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.remaining().as_bytes()).map(|i| self.pos + i)
    }

    /// Find the '>' closing the current tag, skipping quoted attribute values
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut pos = self.pos;
        loop {
            let offset = memchr2(b'>', b'"', &bytes[pos..])
                .into_iter()
                .chain(memchr(b'\'', &bytes[pos..]))
                .min()?;
            let at = pos + offset;
            match bytes[at] {
                b'>' => return Some(at),
                quote => {
                    let close = memchr(quote, &bytes[at + 1..])?;
                    pos = at + 1 + close + 1;
                }
            }
        }
    }

    /// Find the next occurrence of a multi-byte terminator such as `-->`
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        memmem::find(self.remaining().as_bytes(), needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining().as_bytes()).map(|i| self.pos + i)
    }
}

/// XML whitespace
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Characters that terminate a tag or attribute name
#[inline]
pub fn is_name_end(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b'>' | b'/' | b'=' | b'?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_start() {
        let scanner = Scanner::new("hello <world>");
        assert_eq!(scanner.find_tag_start(), Some(6));
    }

    #[test]
    fn test_find_tag_end_skips_quotes() {
        let scanner = Scanner::new(r#"<a title="x > y" alt='>'>"#);
        assert_eq!(scanner.find_tag_end_quoted(), Some(24));
    }

    #[test]
    fn test_find_str() {
        let mut scanner = Scanner::new("<!-- a - b -->rest");
        scanner.advance(4);
        assert_eq!(scanner.find_str("-->"), Some(11));
    }

    #[test]
    fn test_starts_with_ignore_case() {
        let scanner = Scanner::new("<!doctype html>");
        assert!(scanner.starts_with_ignore_case("<!DOCTYPE"));
    }
}
