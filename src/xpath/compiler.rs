//! Lowering of parsed expressions to stack operations
//!
//! Predicates stay attached to their step so that positions count along
//! the axis, per context node. `[n]` and `[@attr = 'value']` get dedicated
//! forms since view selectors are mostly made of them.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};

#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone)]
pub enum Op {
    Root,
    Context,
    /// Replace the node-set on the stack by the step's result from each node
    Navigate(Axis, NodeTest, Vec<CompiledPredicate>),
    /// Filter the whole node-set on the stack
    Predicate(Box<CompiledPredicate>),
    Union,
    Number(f64),
    String(String),
    /// Function name and argument count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
    Variable(String),
}

#[derive(Debug, Clone)]
pub enum CompiledPredicate {
    Position(usize),
    AttrEquals(String, String),
    Expr(CompiledExpr),
}

impl CompiledExpr {
    pub fn compile(expr: &Expr) -> Self {
        let mut compiled = CompiledExpr { ops: Vec::new() };
        compiled.emit(expr);
        compiled
    }

    fn emit(&mut self, expr: &Expr) {
        let op = match expr {
            Expr::Root => Op::Root,
            Expr::Context => Op::Context,
            Expr::Number(n) => Op::Number(*n),
            Expr::String(s) => Op::String(s.clone()),
            Expr::Variable(name) => Op::Variable(name.clone()),
            Expr::Negate(operand) => {
                self.emit(operand);
                Op::Negate
            }
            Expr::Binary(left, op, right) => {
                self.emit(left);
                self.emit(right);
                Op::Binary(*op)
            }
            Expr::Union(left, right) => {
                self.emit(left);
                self.emit(right);
                Op::Union
            }
            Expr::Filter(base, predicate) => {
                self.emit(base);
                Op::Predicate(Box::new(CompiledPredicate::compile(predicate)))
            }
            Expr::Path(base, step) => {
                self.emit(base);
                navigate(step)
            }
            Expr::Step(step) => {
                self.ops.push(Op::Context);
                navigate(step)
            }
            Expr::Function(name, args) => {
                args.iter().for_each(|arg| self.emit(arg));
                Op::Call(name.clone(), args.len())
            }
        };
        self.ops.push(op);
    }

    /// Names of every function called anywhere in the expression
    pub fn function_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_function_names(&mut names);
        names
    }

    fn collect_function_names<'s>(&'s self, names: &mut Vec<&'s str>) {
        for op in &self.ops {
            match op {
                Op::Call(name, _) => names.push(name.as_str()),
                Op::Navigate(_, _, predicates) => predicates.iter().for_each(|p| p.collect_function_names(names)),
                Op::Predicate(predicate) => predicate.collect_function_names(names),
                _ => {}
            }
        }
    }
}

fn navigate(step: &Step) -> Op {
    let predicates = step.predicates.iter().map(CompiledPredicate::compile).collect();
    Op::Navigate(step.axis, step.node_test.clone(), predicates)
}

impl CompiledPredicate {
    fn compile(predicate: &Expr) -> Self {
        match predicate {
            Expr::Number(n) if *n >= 1.0 && n.fract() == 0.0 => CompiledPredicate::Position(*n as usize),
            Expr::Binary(left, BinaryOp::Eq, right) => match attribute_equals(left, right).or_else(|| attribute_equals(right, left)) {
                Some((name, value)) => CompiledPredicate::AttrEquals(name.to_string(), value.to_string()),
                None => CompiledPredicate::Expr(CompiledExpr::compile(predicate)),
            },
            _ => CompiledPredicate::Expr(CompiledExpr::compile(predicate)),
        }
    }

    fn collect_function_names<'s>(&'s self, names: &mut Vec<&'s str>) {
        if let CompiledPredicate::Expr(expr) = self {
            expr.collect_function_names(names);
        }
    }
}

/// `@name` compared with a string literal
fn attribute_equals<'e>(attribute: &'e Expr, literal: &'e Expr) -> Option<(&'e str, &'e str)> {
    let (Expr::Step(step), Expr::String(value)) = (attribute, literal) else {
        return None;
    };
    match &step.node_test {
        NodeTest::Name(name) if step.axis == Axis::Attribute && step.predicates.is_empty() => {
            Some((name.as_str(), value.as_str()))
        }
        _ => None,
    }
}

pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    super::parser::parse(xpath).map(|expr| CompiledExpr::compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let compiled = compile("/form").unwrap();
        assert!(matches!(compiled.ops[..], [Op::Root, Op::Navigate(Axis::Child, NodeTest::Name(_), _)]));
    }

    #[test]
    fn test_step_predicate_forms() {
        let compiled = compile("//field[@name='x'][2]['y' = @string][@a = @b]").unwrap();
        let Some(Op::Navigate(Axis::Child, NodeTest::Name(name), predicates)) = compiled.ops.last() else {
            panic!("unexpected ops {:?}", compiled.ops);
        };
        assert_eq!(name, "field");
        assert!(matches!(&predicates[0], CompiledPredicate::AttrEquals(a, v) if a == "name" && v == "x"));
        assert!(matches!(predicates[1], CompiledPredicate::Position(2)));
        assert!(matches!(&predicates[2], CompiledPredicate::AttrEquals(a, v) if a == "string" && v == "y"));
        assert!(matches!(predicates[3], CompiledPredicate::Expr(_)));
    }

    #[test]
    fn test_function_names_include_predicates() {
        let compiled = compile("//*[hasclass('a')][not(@x)] | (//b)[last()]").unwrap();
        let names = compiled.function_names();
        assert_eq!(names.len(), 3);
        for name in ["hasclass", "not", "last"] {
            assert!(names.contains(&name));
        }
    }
}
