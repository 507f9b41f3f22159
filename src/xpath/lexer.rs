//! XPath tokenizer
//!
//! `and`, `or`, `div` and `mod` are operators only right after something
//! that ends an operand, so `//div` still lexes as a name test.

use super::parser::Axis;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Pipe,
    Plus,
    Minus,
    Star,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Mod,
    Div,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    DoubleColon,
    Comma,
    Dollar,
    Number(f64),
    String(String),
    /// Unprefixed name, also used for function names
    Name(String),
    /// `prefix:local` or `prefix:*`
    NameTest(String),
    /// `node`, `text`, `comment` or `processing-instruction` before `(`
    NodeType(String),
    /// Axis name before `::`
    Axis(Axis),
    /// Input that cannot start a token, an unknown axis or an unterminated
    /// literal
    Invalid(String),
    Eof,
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Dot
                | Token::DoubleDot
                | Token::RightParen
                | Token::RightBracket
                | Token::Number(_)
                | Token::String(_)
                | Token::Name(_)
                | Token::NameTest(_)
                | Token::NodeType(_)
        )
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            after_operand: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        let found = self.peek() == Some(c);
        if found {
            self.pos += c.len_utf8();
        }
        found
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let rest = self.rest();
        self.pos += rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        &self.input[start..self.pos]
    }

    pub fn next_token(&mut self) -> Token {
        let token = self.scan();
        self.after_operand = token.ends_operand();
        token
    }

    fn scan(&mut self) -> Token {
        self.take_while(char::is_whitespace);
        let Some(c) = self.peek() else {
            return Token::Eof;
        };
        match c {
            '"' | '\'' => return self.literal(c),
            '0'..='9' => return self.number(),
            '.' if starts_with_digit(&self.rest()[1..]) => return self.number(),
            _ if is_name_start_char(c) => return self.name(),
            _ => {}
        }

        self.pos += c.len_utf8();
        match c {
            '/' if self.eat('/') => Token::DoubleSlash,
            '/' => Token::Slash,
            '.' if self.eat('.') => Token::DoubleDot,
            '.' => Token::Dot,
            '<' if self.eat('=') => Token::LtEq,
            '<' => Token::Lt,
            '>' if self.eat('=') => Token::GtEq,
            '>' => Token::Gt,
            '!' if self.eat('=') => Token::NotEq,
            ':' if self.eat(':') => Token::DoubleColon,
            '@' => Token::At,
            '|' => Token::Pipe,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '=' => Token::Eq,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ',' => Token::Comma,
            '$' => Token::Dollar,
            other => Token::Invalid(other.to_string()),
        }
    }

    /// `123`, `1.5` or `.5`
    fn number(&mut self) -> Token {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        if self.rest().starts_with('.') && starts_with_digit(&self.rest()[1..]) {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        Token::Number(self.input[start..self.pos].parse().unwrap_or(f64::NAN))
    }

    fn literal(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.pos += quote.len_utf8();
        match self.rest().find(quote) {
            Some(len) => {
                let value = &self.rest()[..len];
                self.pos += len + quote.len_utf8();
                Token::String(value.to_string())
            }
            None => {
                self.pos = self.input.len();
                Token::Invalid(self.input[start..].to_string())
            }
        }
    }

    fn name(&mut self) -> Token {
        let name = self.take_while(is_name_char);
        if self.after_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "div" => return Token::Div,
                "mod" => return Token::Mod,
                _ => {}
            }
        }

        let following = self.rest().trim_start();
        if following.starts_with("::") {
            self.pos = self.input.len() - following.len();
            return match name.parse() {
                Ok(axis) => Token::Axis(axis),
                Err(_) => Token::Invalid(format!("{name}::")),
            };
        }
        if following.starts_with('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name.to_string()),
                _ => Token::Name(name.to_string()),
            };
        }
        if self.rest().starts_with(':') {
            self.pos += 1;
            let local = if self.eat('*') { "*" } else { self.take_while(is_name_char) };
            return Token::NameTest(format!("{name}:{local}"));
        }
        Token::Name(name.to_string())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            token => Some(token),
        }
    }
}

fn starts_with_digit(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit())
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn test_view_path() {
        let tokens: Vec<Token> = Lexer::new(r#"//field[@name="partner_id"]/../label"#).collect();
        assert_eq!(
            tokens,
            [
                Token::DoubleSlash,
                name("field"),
                Token::LeftBracket,
                Token::At,
                name("name"),
                Token::Eq,
                Token::String("partner_id".to_string()),
                Token::RightBracket,
                Token::Slash,
                Token::DoubleDot,
                Token::Slash,
                name("label"),
            ]
        );
    }

    #[test]
    fn test_axis_and_prefixed_names() {
        let tokens: Vec<Token> = Lexer::new("ancestor-or-self :: t:call | t:*").collect();
        assert_eq!(
            tokens,
            [
                Token::Axis(Axis::AncestorOrSelf),
                Token::DoubleColon,
                Token::NameTest("t:call".to_string()),
                Token::Pipe,
                Token::NameTest("t:*".to_string()),
            ]
        );
        assert!(matches!(Lexer::new("sideways::x").next_token(), Token::Invalid(_)));
    }

    #[test]
    fn test_operator_names_are_contextual() {
        let tokens: Vec<Token> = Lexer::new("//div[@a and 1 div 2]/or").collect();
        assert_eq!(tokens[1], name("div"));
        assert!(tokens.contains(&Token::And));
        assert!(tokens.contains(&Token::Div));
        assert_eq!(tokens.last(), Some(&name("or")));
    }

    #[test]
    fn test_functions_and_node_types() {
        let tokens: Vec<Token> = Lexer::new("hasclass('a') and text()").collect();
        assert_eq!(tokens[0], name("hasclass"));
        assert_eq!(tokens[4], Token::And);
        assert_eq!(tokens[5], Token::NodeType("text".to_string()));
    }

    #[test]
    fn test_numbers() {
        let tokens: Vec<Token> = Lexer::new("position() = 1.5 - .5").collect();
        assert_eq!(tokens[4], Token::Number(1.5));
        assert_eq!(tokens[6], Token::Number(0.5));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(Lexer::new("'abc").next_token(), Token::Invalid(s) if s == "'abc"));
        assert!(matches!(Lexer::new("#id").next_token(), Token::Invalid(s) if s == "#"));
        assert!(matches!(Lexer::new("a ! b").nth(1), Some(Token::Invalid(_))));
    }
}
