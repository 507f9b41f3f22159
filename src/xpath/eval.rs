//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against a [`Document`]. Node-set
//! results are sorted by the document's current preorder, so they stay in
//! document order after the tree has been edited.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledPredicate, Op};
use super::functions::{self, CallContext, FunctionTable};
use super::parser::{Axis, BinaryOp, NodeTest};
use super::value::XPathValue;
use crate::dom::{Document, NodeId, DOCUMENT_NODE};
use std::collections::HashSet;

/// Evaluation context
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
    /// Preorder index of every node (see [`Document::document_order`])
    pub order: &'a [u32],
    pub functions: &'a FunctionTable,
}

impl<'a> EvalContext<'a> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> EvalContext<'a> {
        EvalContext {
            doc: self.doc,
            node,
            position,
            size,
            order: self.order,
            functions: self.functions,
        }
    }

    fn sort(&self, nodes: &mut [NodeId]) {
        nodes.sort_by_key(|&n| self.order.get(n as usize).copied().unwrap_or(u32::MAX));
    }
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack
        .pop()
        .ok_or_else(|| "Malformed expression: operand stack underflow".to_string())
}

/// Evaluate a compiled expression
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                // Absolute paths start at the document node
                stack.push(XPathValue::single_node(DOCUMENT_NODE));
            }

            Op::Context => {
                stack.push(XPathValue::single_node(ctx.node));
            }

            Op::Navigate(axis, node_test, predicates) => {
                let result = match pop(&mut stack)? {
                    XPathValue::NodeSet(nodes) if *axis == Axis::Attribute => {
                        if !predicates.is_empty() {
                            return Err("Predicates on attribute steps are not supported".to_string());
                        }
                        XPathValue::StringList(attribute_values(ctx.doc, &nodes, node_test))
                    }
                    XPathValue::NodeSet(nodes) => {
                        XPathValue::NodeSet(navigate_step(ctx, &nodes, *axis, node_test, predicates)?)
                    }
                    // attribute values have no children, parents we can reach, etc.
                    XPathValue::StringList(_) => XPathValue::empty_nodeset(),
                    other => {
                        return Err(format!("Cannot apply a location step to a {}", other.type_name()));
                    }
                };
                stack.push(result);
            }

            Op::Predicate(pred) => match pop(&mut stack)? {
                XPathValue::NodeSet(nodes) => {
                    stack.push(XPathValue::NodeSet(apply_predicate(ctx, nodes, pred)?));
                }
                other => {
                    return Err(format!("Cannot filter a {} with a predicate", other.type_name()));
                }
            },

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;

                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut result = l;
                        result.reserve(r.len());
                        for node in r {
                            if seen.insert(node) {
                                result.push(node);
                            }
                        }
                        ctx.sort(&mut result);
                        stack.push(XPathValue::NodeSet(result));
                    }
                    (XPathValue::StringList(mut l), XPathValue::StringList(r)) => {
                        l.extend(r);
                        stack.push(XPathValue::StringList(l));
                    }
                    (XPathValue::NodeSet(n), XPathValue::StringList(s))
                    | (XPathValue::StringList(s), XPathValue::NodeSet(n))
                        if n.is_empty() || s.is_empty() =>
                    {
                        // one side selected nothing, keep the other
                        if n.is_empty() {
                            stack.push(XPathValue::StringList(s));
                        } else {
                            stack.push(XPathValue::NodeSet(n));
                        }
                    }
                    _ => {
                        return Err("Union requires two node-sets".to_string());
                    }
                }
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Variable(name) => {
                return Err(format!("Undefined variable: ${}", name));
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.to_number_in(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let doc = ctx.doc;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, *op, &left, &right)),
                    BinaryOp::Add => XPathValue::Number(left.to_number_in(doc) + right.to_number_in(doc)),
                    BinaryOp::Sub => XPathValue::Number(left.to_number_in(doc) - right.to_number_in(doc)),
                    BinaryOp::Mul => XPathValue::Number(left.to_number_in(doc) * right.to_number_in(doc)),
                    BinaryOp::Div => XPathValue::Number(left.to_number_in(doc) / right.to_number_in(doc)),
                    BinaryOp::Mod => XPathValue::Number(left.to_number_in(doc) % right.to_number_in(doc)),
                };

                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(format!("Malformed call to {}()", name));
                }
                let args = stack.split_off(stack.len() - arg_count);
                let call_ctx = CallContext {
                    doc: ctx.doc,
                    node: ctx.node,
                    position: ctx.position,
                    size: ctx.size,
                    functions: ctx.functions,
                };
                stack.push(functions::call(name, args, &call_ctx)?);
            }
        }
    }

    pop(&mut stack)
}

/// One location step over a node-set: per context node, select along the
/// axis, apply the node test, then each predicate with axis positions
fn navigate_step(
    ctx: &EvalContext<'_>,
    nodes: &[NodeId],
    axis: Axis,
    node_test: &NodeTest,
    predicates: &[CompiledPredicate],
) -> Result<Vec<NodeId>, String> {
    let mut seen = HashSet::with_capacity(nodes.len());
    let mut result = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let mut selected: Vec<NodeId> = navigate(ctx.doc, node, axis)
            .into_iter()
            .filter(|&candidate| matches_node_test(ctx.doc, candidate, node_test))
            .collect();
        for pred in predicates {
            selected = apply_predicate(ctx, selected, pred)?;
        }
        result.extend(selected.into_iter().filter(|&n| seen.insert(n)));
    }
    ctx.sort(&mut result);
    Ok(result)
}

fn apply_predicate(
    ctx: &EvalContext<'_>,
    nodes: Vec<NodeId>,
    pred: &CompiledPredicate,
) -> Result<Vec<NodeId>, String> {
    match pred {
        // Fast path: [n]
        CompiledPredicate::Position(pos) => Ok(nodes.get(pos - 1).copied().into_iter().collect()),

        // Fast path: [@attr = 'value']
        CompiledPredicate::AttrEquals(attr_name, value) => Ok(nodes
            .into_iter()
            .filter(|&n| ctx.doc.get_attribute(n, attr_name) == Some(value.as_str()))
            .collect()),

        CompiledPredicate::Expr(pred_expr) => {
            let size = nodes.len();
            let mut filtered = Vec::new();
            for (i, node) in nodes.into_iter().enumerate() {
                let pred_result = evaluate_compiled(pred_expr, &ctx.at(node, i + 1, size))?;
                let include = match pred_result {
                    XPathValue::Number(n) => (i + 1) as f64 == n,
                    other => other.to_boolean(),
                };
                if include {
                    filtered.push(node);
                }
            }
            Ok(filtered)
        }
    }
}

/// Values of the attributes selected by `@test` on each node, in order
fn attribute_values(doc: &Document, nodes: &[NodeId], node_test: &NodeTest) -> Vec<String> {
    let mut values = Vec::new();
    for &node in nodes {
        for attr in doc.attributes(node) {
            let matched = match node_test {
                NodeTest::Any | NodeTest::Node => true,
                NodeTest::Name(name) => attr.name == *name,
                NodeTest::QName(prefix, local) => {
                    attr.name.split_once(':') == Some((prefix.as_str(), local.as_str()))
                }
                NodeTest::NamespaceWildcard(prefix) => {
                    attr.name.split_once(':').is_some_and(|(p, _)| p == prefix)
                }
                _ => false,
            };
            if matched {
                values.push(attr.value.clone());
            }
        }
    }
    values
}

/// String values of a node-set or attribute list, None for scalars
fn set_strings(doc: &Document, value: &XPathValue) -> Option<Vec<String>> {
    match value {
        XPathValue::NodeSet(nodes) => Some(nodes.iter().map(|&n| doc.string_value(n)).collect()),
        XPathValue::StringList(values) => Some(values.clone()),
        _ => None,
    }
}

/// XPath 1.0 comparison: sets compare with any-match semantics
fn compare(doc: &Document, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    match (set_strings(doc, left), set_strings(doc, right)) {
        (Some(l), Some(r)) => l.iter().any(|a| {
            r.iter().any(|b| {
                compare_scalars(doc, op, &XPathValue::String(a.clone()), &XPathValue::String(b.clone()))
            })
        }),
        (Some(l), None) => match right {
            XPathValue::Boolean(_) => compare_scalars(doc, op, &XPathValue::Boolean(!l.is_empty()), right),
            _ => l
                .iter()
                .any(|a| compare_scalars(doc, op, &XPathValue::String(a.clone()), right)),
        },
        (None, Some(r)) => match left {
            XPathValue::Boolean(_) => compare_scalars(doc, op, left, &XPathValue::Boolean(!r.is_empty())),
            _ => r
                .iter()
                .any(|b| compare_scalars(doc, op, left, &XPathValue::String(b.clone()))),
        },
        (None, None) => compare_scalars(doc, op, left, right),
    }
}

fn compare_scalars(doc: &Document, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let is_bool = |v: &XPathValue| matches!(v, XPathValue::Boolean(_));
    let is_num = |v: &XPathValue| matches!(v, XPathValue::Number(_));
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if is_bool(left) || is_bool(right) {
                left.to_boolean() == right.to_boolean()
            } else if is_num(left) || is_num(right) {
                left.to_number_in(doc) == right.to_number_in(doc)
            } else {
                left.to_string_in(doc) == right.to_string_in(doc)
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (l, r) = (left.to_number_in(doc), right.to_number_in(doc));
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::compiler::compile;

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        try_eval(doc, xpath).unwrap()
    }

    fn try_eval(doc: &Document, xpath: &str) -> Result<XPathValue, String> {
        let compiled = compile(xpath)?;
        let order = doc.document_order();
        let functions = FunctionTable::standard();
        let ctx = EvalContext {
            doc,
            node: doc.root_element_id().unwrap_or(DOCUMENT_NODE),
            position: 1,
            size: 1,
            order: &order,
            functions: &functions,
        };
        evaluate_compiled(&compiled, &ctx)
    }

    fn names(doc: &Document, value: &XPathValue) -> Vec<String> {
        value
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&n| doc.get_attribute(n, "name").unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let doc = Document::parse("<root><child/></root>").unwrap();
        assert_eq!(eval(&doc, "/root/child").as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_descendant() {
        let doc = Document::parse("<root><a><b/></a></root>").unwrap();
        assert_eq!(eval(&doc, "//b").as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_step_positions_are_per_parent() {
        let doc = Document::parse(
            r#"<form><group><field name="a"/><field name="b"/></group><group><field name="c"/></group></form>"#,
        )
        .unwrap();
        let result = eval(&doc, "//group/field[1]");
        assert_eq!(names(&doc, &result), vec!["a", "c"]);
        // filter expression: position over the whole set
        let result = eval(&doc, "(//group/field)[3]");
        assert_eq!(names(&doc, &result), vec!["c"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = Document::parse(r#"<r><f name="a"/><f name="b"/><f name="c"/></r>"#).unwrap();
        let result = eval(&doc, "//f[@name='c']/preceding-sibling::f[1]");
        assert_eq!(names(&doc, &result), vec!["b"]);
    }

    #[test]
    fn test_parent_step_and_label_union() {
        let doc = Document::parse(
            r#"<form><group><field name="x"/><label for="x"/></group></form>"#,
        )
        .unwrap();
        let result = eval(&doc, r#"//*[@name="x"] | //*[@name="x"]/../label[@for="x"]"#);
        let nodes = result.as_nodeset().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.node_name(nodes[0]), Some("field"));
        assert_eq!(doc.node_name(nodes[1]), Some("label"));
    }

    #[test]
    fn test_union_is_in_document_order_after_edit() {
        let mut doc = Document::parse("<r><a/><b/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let a = doc.children_vec(root)[0];
        doc.detach(a);
        doc.append_child(root, a);
        let result = eval(&doc, "//a | //b");
        let nodes = result.as_nodeset().unwrap();
        assert_eq!(doc.node_name(nodes[0]), Some("b"));
        assert_eq!(doc.node_name(nodes[1]), Some("a"));
    }

    #[test]
    fn test_attribute_existence_and_comparison() {
        let doc = Document::parse(r#"<r><f name="a" invisible=""/><f name="b"/></r>"#).unwrap();
        assert_eq!(names(&doc, &eval(&doc, "//f[@invisible]")), vec!["a"]);
        assert_eq!(names(&doc, &eval(&doc, "//f[not(@invisible)]")), vec!["b"]);
        assert!(eval(&doc, "//f/@name = 'b'").to_boolean());
        assert!(!eval(&doc, "//f/@name = 'z'").to_boolean());
        assert!(eval(&doc, "//f/@name != 'a'").to_boolean());
    }

    #[test]
    fn test_negative_existential_guard() {
        let doc = Document::parse(r#"<form><field name="a"/><field name="b"/></form>"#).unwrap();
        let guarded = "//field[@name='a'][not(../field[@name='b'])]";
        assert!(eval(&doc, guarded).as_nodeset().unwrap().is_empty());
        let guarded = "//field[@name='a'][not(../field[@name='c'])]";
        assert_eq!(eval(&doc, guarded).as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_hasclass_selector() {
        let doc = Document::parse(
            r#"<div class="panel"><div class="panel-body"><div class="x panel-body"/></div></div>"#,
        )
        .unwrap();
        let direct = eval(&doc, "//*[hasclass('panel')]/*[hasclass('panel-body')]");
        assert_eq!(direct.as_nodeset().unwrap().len(), 1);
        let deep = eval(&doc, "//*[hasclass('panel')]//*[hasclass('panel-body')]");
        assert_eq!(deep.as_nodeset().unwrap().len(), 2);
    }

    #[test]
    fn test_scalar_results() {
        let doc = Document::parse("<root><a/><b/><c/></root>").unwrap();
        assert_eq!(eval(&doc, "count(/root/*)"), XPathValue::Number(3.0));
        assert_eq!(eval(&doc, "string-length('hello')"), XPathValue::Number(5.0));
        assert_eq!(eval(&doc, "1 + 2 * 3"), XPathValue::Number(7.0));
        assert_eq!(eval(&doc, "count(//*) > 2"), XPathValue::Boolean(true));
    }

    #[test]
    fn test_context_relative_path() {
        let doc = Document::parse("<root><a><b/></a></root>").unwrap();
        assert_eq!(eval(&doc, "a/b").as_nodeset().unwrap().len(), 1);
        assert_eq!(eval(&doc, ".").as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_undefined_variable_errors() {
        let doc = Document::parse("<root/>").unwrap();
        assert!(try_eval(&doc, "$foo").unwrap_err().contains("Undefined variable"));
    }

    #[test]
    fn test_union_of_scalars_errors() {
        let doc = Document::parse("<root/>").unwrap();
        assert!(try_eval(&doc, "count(//a) | //b").is_err());
    }
}
