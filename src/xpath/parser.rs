//! XPath parser
//!
//! Recursive descent over the token stream, with precedence climbing for
//! binary operators. `//` expands to `/descendant-or-self::node()/`.

use super::lexer::{Lexer, Token};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum Expr {
    /// `/`
    Root,
    /// `.`
    Context,
    Union(Box<Expr>, Box<Expr>),
    /// A step applied to every node selected by the left side
    Path(Box<Expr>, Box<Step>),
    /// A predicate applied to a whole node-set, as in `(//a)[1]`
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    Variable(String),
    /// A relative location step
    Step(Box<Step>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// The operator a token stands for and how tightly it binds
    fn from_token(token: &Token) -> Option<(BinaryOp, u8)> {
        let op = match token {
            Token::Or => (BinaryOp::Or, 1),
            Token::And => (BinaryOp::And, 2),
            Token::Eq => (BinaryOp::Eq, 3),
            Token::NotEq => (BinaryOp::NotEq, 3),
            Token::Lt => (BinaryOp::Lt, 4),
            Token::LtEq => (BinaryOp::LtEq, 4),
            Token::Gt => (BinaryOp::Gt, 4),
            Token::GtEq => (BinaryOp::GtEq, 4),
            Token::Plus => (BinaryOp::Add, 5),
            Token::Minus => (BinaryOp::Sub, 5),
            Token::Star => (BinaryOp::Mul, 6),
            Token::Div => (BinaryOp::Div, 6),
            Token::Mod => (BinaryOp::Mod, 6),
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let axis = match s {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "self" => Axis::Self_,
            "attribute" => Axis::Attribute,
            "namespace" => Axis::Namespace,
            _ => return Err(format!("Unknown axis: {s}")),
        };
        Ok(axis)
    }
}

#[derive(Debug, Clone)]
pub enum NodeTest {
    /// `*`
    Any,
    Name(String),
    /// `prefix:local`
    QName(String, String),
    /// `prefix:*`
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            peeked: None,
        }
    }

    /// Parse a whole expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr, String> {
        let expr = self.expr()?;
        match &self.current {
            Token::Eof => Ok(expr),
            token => Err(format!("Unexpected token after expression: {token:?}")),
        }
    }

    /// Move to the next token, returning the one consumed
    fn advance(&mut self) -> Token {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        };
        std::mem::replace(&mut self.current, next)
    }

    fn peek(&mut self) -> &Token {
        let lexer = &mut self.lexer;
        self.peeked.get_or_insert_with(|| lexer.next_token())
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.current != token {
            return Err(format!("Expected {token:?}, got {:?}", self.current));
        }
        self.advance();
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, String> {
        self.binary(0)
    }

    /// Operand followed by operators binding tighter than `min_power`
    fn binary(&mut self, min_power: u8) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while let Some((op, power)) = BinaryOp::from_token(&self.current) {
            if power <= min_power {
                break;
            }
            self.advance();
            let right = self.binary(power)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.current == Token::Minus {
            self.advance();
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        let mut expr = self.path()?;
        while self.current == Token::Pipe {
            self.advance();
            expr = Expr::Union(Box::new(expr), Box::new(self.path()?));
        }
        Ok(expr)
    }

    fn path(&mut self) -> Result<Expr, String> {
        let start = match self.current {
            Token::Slash => {
                self.advance();
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                Expr::Path(Box::new(Expr::Root), Box::new(self.step()?))
            }
            Token::DoubleSlash => {
                self.advance();
                let descendants = Expr::Path(Box::new(Expr::Root), Box::new(Step::descendant_or_self()));
                Expr::Path(Box::new(descendants), Box::new(self.step()?))
            }
            _ => self.primary()?,
        };
        self.continue_path(start)
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Name(_)
                | Token::NameTest(_)
                | Token::NodeType(_)
                | Token::Axis(_)
                | Token::Star
                | Token::At
                | Token::Dot
                | Token::DoubleDot
        )
    }

    /// Trailing `/step`, `//step` and `[predicate]` parts
    fn continue_path(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            expr = match self.current {
                Token::Slash => {
                    self.advance();
                    Expr::Path(Box::new(expr), Box::new(self.step()?))
                }
                Token::DoubleSlash => {
                    self.advance();
                    let descendants = Expr::Path(Box::new(expr), Box::new(Step::descendant_or_self()));
                    Expr::Path(Box::new(descendants), Box::new(self.step()?))
                }
                Token::LeftBracket => Expr::Filter(Box::new(expr), Box::new(self.predicate()?)),
                _ => return Ok(expr),
            };
        }
    }

    fn predicate(&mut self) -> Result<Expr, String> {
        self.expect(Token::LeftBracket)?;
        let expr = self.expr()?;
        self.expect(Token::RightBracket)?;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        if matches!(self.current, Token::Name(_)) && *self.peek() == Token::LeftParen {
            return self.function_call();
        }
        let expr = match &self.current {
            Token::Number(n) => Expr::Number(*n),
            Token::String(s) => Expr::String(s.clone()),
            Token::Dot => Expr::Context,
            Token::Dollar => {
                self.advance();
                return match self.advance() {
                    Token::Name(name) => Ok(Expr::Variable(name)),
                    other => Err(format!("Expected variable name, got {other:?}")),
                };
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.expr()?;
                self.expect(Token::RightParen)?;
                return Ok(expr);
            }
            Token::Invalid(s) => return Err(format!("Unexpected input: {s}")),
            _ => return Ok(Expr::Step(Box::new(self.step()?))),
        };
        self.advance();
        Ok(expr)
    }

    fn function_call(&mut self) -> Result<Expr, String> {
        let name = match self.advance() {
            Token::Name(name) => name,
            other => return Err(format!("Expected function name, got {other:?}")),
        };
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            args.push(self.expr()?);
            while self.current == Token::Comma {
                self.advance();
                args.push(self.expr()?);
            }
        }
        self.expect(Token::RightParen)?;
        Ok(Expr::Function(name, args))
    }

    fn step(&mut self) -> Result<Step, String> {
        let axis = match self.current {
            Token::Dot => {
                self.advance();
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(axis) => {
                self.advance();
                self.expect(Token::DoubleColon)?;
                axis
            }
            _ => Axis::Child,
        };
        let mut step = Step::new(axis, self.node_test()?);
        while self.current == Token::LeftBracket {
            step.predicates.push(self.predicate()?);
        }
        Ok(step)
    }

    fn node_test(&mut self) -> Result<NodeTest, String> {
        match self.advance() {
            Token::Star => Ok(NodeTest::Any),
            Token::Name(name) => Ok(NodeTest::Name(name)),
            Token::NameTest(qname) => Ok(match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname.clone()),
            }),
            Token::NodeType(kind) => {
                self.expect(Token::LeftParen)?;
                let target = match &self.current {
                    Token::String(s) => Some(s.clone()),
                    _ => None,
                };
                if target.is_some() {
                    self.advance();
                }
                self.expect(Token::RightParen)?;
                match kind.as_str() {
                    "node" => Ok(NodeTest::Node),
                    "text" => Ok(NodeTest::Text),
                    "comment" => Ok(NodeTest::Comment),
                    "processing-instruction" => Ok(NodeTest::ProcessingInstruction(target)),
                    _ => Err(format!("Unknown node type: {kind}")),
                }
            }
            other => Err(format!("Expected node test, got {other:?}")),
        }
    }
}

/// Parse an XPath expression
pub fn parse(input: &str) -> Result<Expr, String> {
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant_path_with_predicate() {
        let Expr::Path(base, step) = parse(r#"//field[@name="x"]"#).unwrap() else {
            panic!("expected a path");
        };
        assert!(matches!(*base, Expr::Path(ref root, ref s) if matches!(**root, Expr::Root) && s.axis == Axis::DescendantOrSelf));
        assert_eq!(step.axis, Axis::Child);
        assert!(matches!(step.node_test, NodeTest::Name(ref n) if n == "field"));
        assert_eq!(step.predicates.len(), 1);
    }

    #[test]
    fn test_parent_and_label_union() {
        let expr = parse(r#"//field[@name="x"] | //field[@name="x"]/../label[@for="x"]"#).unwrap();
        let Expr::Union(_, right) = expr else {
            panic!("expected a union");
        };
        let Expr::Path(parent, label) = *right else {
            panic!("expected a path");
        };
        assert!(matches!(*parent, Expr::Path(_, ref s) if s.axis == Axis::Parent));
        assert!(matches!(label.node_test, NodeTest::Name(ref n) if n == "label"));
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3 = 7 and not(false()) or 0").unwrap();
        let Expr::Binary(left, BinaryOp::Or, _) = expr else {
            panic!("expected `or` at the top");
        };
        let Expr::Binary(eq, BinaryOp::And, _) = *left else {
            panic!("expected `and` under `or`");
        };
        let Expr::Binary(sum, BinaryOp::Eq, _) = *eq else {
            panic!("expected `=` under `and`");
        };
        assert!(matches!(*sum, Expr::Binary(_, BinaryOp::Add, ref product) if matches!(**product, Expr::Binary(_, BinaryOp::Mul, _))));
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let Expr::Binary(left, BinaryOp::Sub, right) = parse("5 - 2 - 1").unwrap() else {
            panic!("expected a subtraction");
        };
        assert!(matches!(*left, Expr::Binary(_, BinaryOp::Sub, _)));
        assert!(matches!(*right, Expr::Number(n) if n == 1.0));
    }

    #[test]
    fn test_filter_and_functions() {
        assert!(matches!(parse("(//li)[last()]").unwrap(), Expr::Filter(..)));
        let Expr::Step(step) = parse("div[hasclass('a', 'b')]").unwrap() else {
            panic!("expected a step");
        };
        assert!(matches!(&step.predicates[0], Expr::Function(name, args) if name == "hasclass" && args.len() == 2));
    }

    #[test]
    fn test_axes_and_node_types() {
        let Expr::Step(step) = parse("ancestor-or-self::t:*").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(step.axis, Axis::AncestorOrSelf);
        assert!(matches!(step.node_test, NodeTest::NamespaceWildcard(ref p) if p == "t"));
        let Expr::Path(_, step) = parse("/processing-instruction('xml-stylesheet')").unwrap() else {
            panic!("expected a path");
        };
        assert!(matches!(step.node_test, NodeTest::ProcessingInstruction(Some(ref t)) if t == "xml-stylesheet"));
        assert!(matches!(parse("/").unwrap(), Expr::Root));
    }

    #[test]
    fn test_errors() {
        assert!(parse("//field]").is_err());
        assert!(parse(r#"//field[@name="x""#).is_err());
        assert!(parse("sideways::x").is_err());
        assert!(parse("#main").is_err());
        assert!(parse("$").is_err());
    }
}
