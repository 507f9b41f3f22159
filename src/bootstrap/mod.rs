//! Bootstrap 3 to Bootstrap 4 conversion of view archs and HTML content.
//!
//! ```
//! use viewpatch::bootstrap::Bs3To4Converter;
//!
//! let converted = Bs3To4Converter::convert_arch(r#"<span class="label label-info">new</span>"#, false).unwrap();
//! assert_eq!(converted, r#"<span class="badge badge-info">new</span>"#);
//! ```

pub mod classes;
pub mod converter;
pub mod css;
pub mod ops;
pub mod rules;

pub use classes::ClassList;
pub use converter::Bs3To4Converter;
pub use css::simple_css_selector_to_xpath;
pub use ops::ElementOp;
