//! Minimal CSS selector to XPath translation.
//!
//! Supported: tag names, `*`, any number of `.class` conditions, the
//! descendant (whitespace) and child (`>`) combinators, and selector
//! lists (`,`). Class conditions use the `hasclass()` extension.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static COMBINATOR_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s*[+>,~ ]\s*"));

/// Split keeping the combinators, alternating part / combinator / part
fn split_keeping_combinators(selector: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in COMBINATOR_REGEX.find_iter(selector) {
        pieces.push(&selector[last..m.start()]);
        pieces.push(m.as_str());
        last = m.end();
    }
    pieces.push(&selector[last..]);
    pieces
}

fn is_compound_start(part: &str) -> bool {
    part.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '*' || c == '.')
}

/// Translate a simple CSS selector into an XPath expression.
///
/// ```
/// use viewpatch::bootstrap::simple_css_selector_to_xpath;
///
/// assert_eq!(
///     simple_css_selector_to_xpath(".pagination > li").unwrap(),
///     "//*[hasclass('pagination')]/li"
/// );
/// ```
pub fn simple_css_selector_to_xpath(selector: &str) -> Result<String> {
    let mut separator = "//";
    let mut xpath = String::new();
    for piece in split_keeping_combinators(selector) {
        let part = piece.trim();
        if part.is_empty() {
            separator = "//";
        } else if part == ">" {
            separator = "/";
        } else if part == "," {
            // each alternative of a list is searched from the whole document
            xpath.push('|');
            separator = "//";
        } else if is_compound_start(part) {
            let mut names = part.split('.');
            let element = names.next().filter(|e| !e.is_empty()).unwrap_or("*");
            xpath.push_str(separator);
            xpath.push_str(element);
            for class in names.filter(|c| !c.is_empty()) {
                xpath.push_str(&format!("[hasclass('{class}')]"));
            }
        } else {
            return Err(Error::UnsupportedSelector(selector.to_string()));
        }
    }
    Ok(xpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_class_and_descendant() {
        assert_eq!(
            simple_css_selector_to_xpath(".form-group .control-label").unwrap(),
            "//*[hasclass('form-group')]//*[hasclass('control-label')]"
        );
    }

    #[test]
    fn test_tag_with_several_classes() {
        assert_eq!(
            simple_css_selector_to_xpath("table.table.table-condensed").unwrap(),
            "//table[hasclass('table')][hasclass('table-condensed')]"
        );
        assert_eq!(simple_css_selector_to_xpath("blockquote").unwrap(), "//blockquote");
        assert_eq!(simple_css_selector_to_xpath("*").unwrap(), "//*");
    }

    #[test]
    fn test_child_and_list_combinators() {
        assert_eq!(
            simple_css_selector_to_xpath(".nav.navbar > li > a").unwrap(),
            "//*[hasclass('nav')][hasclass('navbar')]/li/a"
        );
        assert_eq!(
            simple_css_selector_to_xpath("tr.active, td.active").unwrap(),
            "//tr[hasclass('active')]|//td[hasclass('active')]"
        );
    }

    #[test]
    fn test_unsupported_syntax() {
        for selector in ["#main", "a + b", "li ~ li", "[data-x]"] {
            let err = simple_css_selector_to_xpath(selector).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{selector}");
            assert!(err.to_string().contains(selector));
        }
    }

    #[test]
    fn test_translated_selectors_compile() {
        let xpath = simple_css_selector_to_xpath(".dropdown-menu > li > a").unwrap();
        assert!(crate::xpath::XPath::new(&xpath).is_ok());
    }
}
