//! XPath Axes Implementation
//!
//! Node axes return nodes in axis order: document order for forward axes,
//! reverse document order for ancestor, preceding and preceding-sibling.
//! The attribute axis is handled by the evaluator (attributes are not arena
//! nodes); the namespace axis is always empty since names are not
//! namespace-resolved.

use super::parser::{Axis, NodeTest};
use crate::dom::{Document, NodeId, NodeKind};

/// Navigate along a node axis from a context node
pub fn navigate(doc: &Document, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(doc.descendants(context));
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestors(doc, context));
            result
        }
        Axis::FollowingSibling => siblings(doc, context, Document::next_sibling_of),
        Axis::PrecedingSibling => siblings(doc, context, Document::prev_sibling_of),
        Axis::Following => following(doc, context),
        Axis::Preceding => preceding(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

/// Whether the axis yields nodes in reverse document order
pub fn is_reverse(axis: Axis) -> bool {
    matches!(
        axis,
        Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
    )
}

fn ancestors(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }
    result
}

fn siblings(
    doc: &Document,
    context: NodeId,
    step: fn(&Document, NodeId) -> Option<NodeId>,
) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = step(doc, context);
    while let Some(id) = sibling {
        result.push(id);
        sibling = step(doc, id);
    }
    result
}

/// following:: axis - nodes after the context's subtree, in document order
fn following(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);
    while let Some(node) = current {
        let mut sibling = doc.next_sibling_of(node);
        while let Some(id) = sibling {
            result.push(id);
            result.extend(doc.descendants(id));
            sibling = doc.next_sibling_of(id);
        }
        current = doc.parent_of(node);
    }
    result
}

/// preceding:: axis - nodes before the context, excluding ancestors,
/// nearest first
fn preceding(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);
    while let Some(node) = current {
        let mut sibling = doc.prev_sibling_of(node);
        while let Some(id) = sibling {
            let mut subtree = vec![id];
            subtree.extend(doc.descendants(id));
            result.extend(subtree.into_iter().rev());
            sibling = doc.prev_sibling_of(id);
        }
        current = doc.parent_of(node);
    }
    result
}

/// Check if a node matches a node test
pub fn matches_node_test(doc: &Document, node_id: NodeId, node_test: &NodeTest) -> bool {
    let Some(node) = doc.get_node(node_id) else {
        return false;
    };
    let kind = node.kind;

    match node_test {
        // * matches any element
        NodeTest::Any => kind == NodeKind::Element,
        NodeTest::Name(name) => kind == NodeKind::Element && node.name == *name,
        NodeTest::QName(prefix, local) => {
            kind == NodeKind::Element
                && node.prefix() == Some(prefix.as_str())
                && node.local_name() == local
        }
        NodeTest::NamespaceWildcard(prefix) => {
            kind == NodeKind::Element && node.prefix() == Some(prefix.as_str())
        }
        NodeTest::Node => true,
        NodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_ref().is_none_or(|t| node.name == *t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_and_root(xml: &str) -> (Document, NodeId) {
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element_id().unwrap();
        (doc, root)
    }

    #[test]
    fn test_child_axis() {
        let (doc, root) = doc_and_root("<root><a/><b/></root>");
        assert_eq!(navigate(&doc, root, Axis::Child).len(), 2);
    }

    #[test]
    fn test_descendant_axis() {
        let (doc, root) = doc_and_root("<root><a><b/></a><c/></root>");
        assert_eq!(navigate(&doc, root, Axis::Descendant).len(), 3);
    }

    #[test]
    fn test_ancestor_axis() {
        let (doc, root) = doc_and_root("<root><a><b/></a></root>");
        let a = doc.children_vec(root)[0];
        let b = doc.children_vec(a)[0];
        // a, root, document
        assert_eq!(navigate(&doc, b, Axis::Ancestor), vec![a, root, 0]);
    }

    #[test]
    fn test_preceding_sibling_is_nearest_first() {
        let (doc, root) = doc_and_root("<root><a/><b/><c/></root>");
        let kids = doc.children_vec(root);
        assert_eq!(navigate(&doc, kids[2], Axis::PrecedingSibling), vec![kids[1], kids[0]]);
    }

    #[test]
    fn test_preceding_excludes_ancestors() {
        let (doc, root) = doc_and_root("<root><a><x/></a><b><c/></b></root>");
        let kids = doc.children_vec(root);
        let x = doc.children_vec(kids[0])[0];
        let c = doc.children_vec(kids[1])[0];
        assert_eq!(navigate(&doc, c, Axis::Preceding), vec![x, kids[0]]);
    }

    #[test]
    fn test_following_axis() {
        let (doc, root) = doc_and_root("<root><a><x/></a><b><c/></b></root>");
        let kids = doc.children_vec(root);
        let x = doc.children_vec(kids[0])[0];
        let c = doc.children_vec(kids[1])[0];
        assert_eq!(navigate(&doc, x, Axis::Following), vec![kids[1], c]);
    }

    #[test]
    fn test_name_test_uses_full_name() {
        let (doc, root) = doc_and_root("<root><t:call/><call/></root>");
        let kids = doc.children_vec(root);
        let plain = NodeTest::Name("call".to_string());
        assert!(!matches_node_test(&doc, kids[0], &plain));
        assert!(matches_node_test(&doc, kids[1], &plain));
        let prefixed = NodeTest::QName("t".to_string(), "call".to_string());
        assert!(matches_node_test(&doc, kids[0], &prefixed));
    }
}
