//! Fragment insertion operations

use super::{join_display, ArchLookup, ViewOperation};
use crate::dom::{Document, DocumentMode, NodeId, DOCUMENT_NODE};
use crate::error::{Error, Result};
use crate::resolve::ViewRef;
use crate::selector::{extract_elements, Selector};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where inserted elements go relative to each matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddElementPosition {
    /// Last children of the matched element
    #[default]
    Inside,
    /// Next siblings, in fragment order
    After,
    /// Previous siblings, in fragment order
    Before,
    /// In place of the matched element
    Replace,
}

impl AddElementPosition {
    const ALL: [AddElementPosition; 4] = [
        AddElementPosition::Inside,
        AddElementPosition::After,
        AddElementPosition::Before,
        AddElementPosition::Replace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AddElementPosition::Inside => "inside",
            AddElementPosition::After => "after",
            AddElementPosition::Before => "before",
            AddElementPosition::Replace => "replace",
        }
    }
}

impl FromStr for AddElementPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<String> = Self::ALL.iter().map(|p| p.as_str().to_uppercase()).collect();
                Error::InvalidArgument(format!(
                    "\"position\" must be one of {}, got \"{s}\"",
                    names.join(",")
                ))
            })
    }
}

impl fmt::Display for AddElementPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed XML fragment of one or more sibling elements
#[derive(Debug, Clone)]
struct Fragment {
    source: String,
    doc: Document,
    elements: Vec<NodeId>,
}

impl Fragment {
    fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse_fragment(xml, DocumentMode::Xml)?;
        let elements = doc
            .root_element_id()
            .map(|wrapper| doc.element_children(wrapper))
            .unwrap_or_default();
        if elements.is_empty() {
            return Err(Error::InvalidArgument(format!("Invalid xml provided: {xml}")));
        }
        Ok(Fragment {
            source: xml.to_string(),
            doc,
            elements,
        })
    }

    /// Insert fresh copies of the fragment elements at `target`.
    ///
    /// Fails when that would give the document more than one root element.
    fn insert(&self, doc: &mut Document, target: NodeId, position: AddElementPosition) -> Result<()> {
        let adds_root_sibling = match position {
            AddElementPosition::Inside => false,
            AddElementPosition::Before | AddElementPosition::After => true,
            AddElementPosition::Replace => self.elements.len() > 1,
        };
        if adds_root_sibling && doc.parent_of(target) == Some(DOCUMENT_NODE) {
            return Err(Error::Usage(format!(
                "Cannot add elements {position} the root element `{}`",
                doc.node_name(target).unwrap_or_default()
            )));
        }
        let copies: Vec<NodeId> = self
            .elements
            .iter()
            .map(|&el| doc.import_subtree(&self.doc, el))
            .collect();
        match position {
            AddElementPosition::Inside => {
                for copy in copies {
                    doc.append_child(target, copy);
                }
            }
            AddElementPosition::Before => {
                for copy in copies {
                    doc.insert_before(target, copy);
                }
            }
            AddElementPosition::After => {
                for &copy in copies.iter().rev() {
                    doc.insert_after(target, copy);
                }
            }
            AddElementPosition::Replace => {
                if let Some((&last, rest)) = copies.split_last() {
                    for &copy in rest {
                        doc.insert_before(target, copy);
                    }
                    doc.replace_node(target, last);
                }
            }
        }
        Ok(())
    }
}

/// Insert an XML fragment at every matched element
#[derive(Debug, Clone)]
pub struct AddElements {
    selector: Selector,
    fragment: Fragment,
    position: AddElementPosition,
}

impl AddElements {
    pub fn new<I, S>(xpaths: I, elements_xml: &str, position: AddElementPosition) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(AddElements {
            selector: Selector::new(xpaths)?,
            fragment: Fragment::parse(elements_xml)?,
            position,
        })
    }

    pub fn position(&self) -> AddElementPosition {
        self.position
    }

    /// The fragment as given
    pub fn elements_xml(&self) -> &str {
        &self.fragment.source
    }
}

impl ViewOperation for AddElements {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.selector
            .for_each_match(doc, |doc, target| self.fragment.insert(doc, target, self.position))
    }
}

impl fmt::Display for AddElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Add elements `{}` at XPath(s) `{}` (position: `{}`)",
            self.fragment.source, self.selector, self.position
        )
    }
}

/// Insert elements extracted from an XML file.
///
/// The file is read and the elements extracted once, when the operation is
/// built.
#[derive(Debug, Clone)]
pub struct AddElementsFromFile {
    path: PathBuf,
    source: Selector,
    inner: AddElements,
}

impl AddElementsFromFile {
    /// Extract the root element of the file
    pub fn new<I, S>(xpaths: I, path: impl AsRef<Path>, position: AddElementPosition) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_source(xpaths, path, ["/*"], position)
    }

    /// Extract the elements matching `source_xpaths` from the file
    pub fn with_source<I, S, J, T>(
        xpaths: I,
        path: impl AsRef<Path>,
        source_xpaths: J,
        position: AddElementPosition,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        J: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let path = path.as_ref().to_path_buf();
        let source = Selector::new(source_xpaths)?;
        let text = std::fs::read_to_string(&path)?;
        let file_doc = Document::parse(&text)?;
        let display = path.display().to_string();
        let elements_xml = extract_elements(&file_doc, &source, Some(&display))?;
        Ok(AddElementsFromFile {
            inner: AddElements::new(xpaths, &elements_xml, position)?,
            path,
            source,
        })
    }
}

impl ViewOperation for AddElementsFromFile {
    fn apply(&self, doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.inner.apply(doc, lookup)
    }
}

impl fmt::Display for AddElementsFromFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Add elements from file `{}` matching XPath(s) `{}` (source) at `{}` (target)",
            self.path.display(),
            self.source,
            self.inner.selector
        )
    }
}

/// Copy elements from the edited view itself or from another view.
///
/// The source elements are extracted again on every application, so a copy
/// within one view sees the edits made before it.
#[derive(Debug, Clone)]
pub struct CopyElements {
    source: Selector,
    selector: Selector,
    from_view: Option<ViewRef>,
    position: AddElementPosition,
}

impl CopyElements {
    pub fn new<I, S, J, T>(
        source_xpaths: J,
        xpaths: I,
        from_view: Option<ViewRef>,
        position: AddElementPosition,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        J: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Ok(CopyElements {
            source: Selector::new(source_xpaths)?,
            selector: Selector::new(xpaths)?,
            from_view,
            position,
        })
    }
}

impl ViewOperation for CopyElements {
    fn apply(&self, doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()> {
        let elements_xml = match &self.from_view {
            Some(view) => {
                let lookup = lookup.ok_or_else(|| {
                    Error::Usage("Cannot copy elements from other views without a view store".to_string())
                })?;
                let source = lookup.fetch_arch(view)?;
                extract_elements(&source, &self.source, Some(&view.to_string()))?
            }
            None => extract_elements(doc, &self.source, None)?,
        };
        let fragment = Fragment::parse(&elements_xml)?;
        self.selector
            .for_each_match(doc, |doc, target| fragment.insert(doc, target, self.position))
    }
}

impl fmt::Display for CopyElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Copy elements matching XPath(s) `{}` to elements matching XPath(s) `{}`",
            self.source, self.selector
        )?;
        if let Some(view) = &self.from_view {
            write!(f, " from view {view}")?;
        }
        Ok(())
    }
}

/// Add an invisible `<field>` next to named fields, unless the parent
/// already has that field
#[derive(Debug, Clone)]
pub struct AddInvisibleSiblingFields {
    names: Vec<String>,
    sibling: String,
    inner: AddElements,
}

impl AddInvisibleSiblingFields {
    pub fn new<I, S>(names: I, sibling: &str, position: AddElementPosition) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let xpaths: Vec<String> = names
            .iter()
            .map(|name| format!(r#"//field[@name="{name}" and not(../field[@name="{sibling}"])]"#))
            .collect();
        let fragment = format!(r#"<field name="{sibling}" invisible="1" />"#);
        Ok(AddInvisibleSiblingFields {
            inner: AddElements::new(xpaths, &fragment, position)?,
            names,
            sibling: sibling.to_string(),
        })
    }
}

impl ViewOperation for AddInvisibleSiblingFields {
    fn apply(&self, doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.inner.apply(doc, lookup)
    }
}

impl fmt::Display for AddInvisibleSiblingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.names.iter().map(|n| format!("field[@name='{n}']")).collect();
        write!(
            f,
            "Add invisible sibling `field[@name='{}']` to all `{}`",
            self.sibling,
            join_display(&names)
        )
    }
}
