//! Tokenizer and parser for hook scripts.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! script     := expr (';' expr)* ';'?
//! expr       := or ('?' or ':' expr)?
//! or         := and ('||' and)*
//! and        := comparison ('&&' comparison)*
//! comparison := unary (('==' | '!=' | '>' | '<' | '>=' | '<=') unary)*
//! unary      := '!' unary | primary
//! primary    := string | number | $variable | name ('(' args ')')? | '(' expr ')'
//! ```

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Str(String),
    Number(i64),
    Variable(String),
    And,
    Or,
    Not,
    Question,
    Colon,
    Semicolon,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    LeftParen,
    RightParen,
    Comma,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(s) => write!(f, "name '{}'", s),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Variable(v) => write!(f, "variable ${}", v),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Semicolon => f.write_str(";"),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::Greater => f.write_str(">"),
            Token::Less => f.write_str("<"),
            Token::GreaterEqual => f.write_str(">="),
            Token::LessEqual => f.write_str("<="),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call { name: String, args: Vec<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Not(Box<Expr>),
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Str(String),
    Number(i64),
    Variable(String),
    Sequence(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LessEqual => "<=",
        };
        f.write_str(text)
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.current();
        self.position += 1;
        ch
    }

    /// Consume `second` if it follows, yielding `double`; otherwise `single`.
    fn pair(&mut self, second: char, double: Token, single: Option<Token>, lone: char) -> Result<Token, String> {
        if self.current() == Some(second) {
            self.bump();
            Ok(double)
        } else {
            single.ok_or_else(|| format!("Expected '{}{}', found single '{}'", lone, second, lone))
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                c if c == quote => return Ok(out),
                '\\' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                other => out.push(other),
            }
        }
        Err("Unterminated string literal".to_string())
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.current() {
            if !keep(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    pub fn next_token(&mut self) -> Result<Token, String> {
        self.read_while(char::is_whitespace);
        let ch = match self.bump() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };
        match ch {
            '(' => Ok(Token::LeftParen),
            ')' => Ok(Token::RightParen),
            ',' => Ok(Token::Comma),
            '?' => Ok(Token::Question),
            ':' => Ok(Token::Colon),
            ';' => Ok(Token::Semicolon),
            '&' => self.pair('&', Token::And, None, '&'),
            '|' => self.pair('|', Token::Or, None, '|'),
            '=' => self.pair('=', Token::Equal, None, '='),
            '!' => self.pair('=', Token::NotEqual, Some(Token::Not), '!'),
            '>' => self.pair('=', Token::GreaterEqual, Some(Token::Greater), '>'),
            '<' => self.pair('=', Token::LessEqual, Some(Token::Less), '<'),
            '"' | '\'' => self.read_string(ch).map(Token::Str),
            '$' => {
                let name = self.read_while(|c| c.is_alphanumeric() || c == '_');
                if name.is_empty() {
                    Err("Expected variable name after '$'".to_string())
                } else {
                    Ok(Token::Variable(name))
                }
            }
            c if c.is_ascii_digit() => {
                let mut digits = c.to_string();
                digits.push_str(&self.read_while(|c| c.is_ascii_digit()));
                digits
                    .parse()
                    .map(Token::Number)
                    .map_err(|_| format!("Number out of range: {}", digits))
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = c.to_string();
                name.push_str(&self.read_while(|c| c.is_alphanumeric() || c == '_'));
                Ok(Token::Name(name))
            }
            other => Err(format!("Unexpected character: '{}'", other)),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if *self.current() == expected {
            self.bump();
            Ok(())
        } else {
            Err(format!("Expected {}, found {}", expected, self.current()))
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.bump() {
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Variable(v) => Ok(Expr::Variable(v)),
            Token::Name(name) => {
                let mut args = Vec::new();
                if *self.current() == Token::LeftParen {
                    self.bump();
                    if *self.current() != Token::RightParen {
                        loop {
                            args.push(self.expr()?);
                            if *self.current() == Token::Comma {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RightParen)?;
                }
                Ok(Expr::Call { name, args })
            }
            Token::LeftParen => {
                let inner = self.expr()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            token => Err(format!("Unexpected token in expression: {}", token)),
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if *self.current() == Token::Not {
            self.bump();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current() {
                Token::Equal => BinaryOp::Equal,
                Token::NotEqual => BinaryOp::NotEqual,
                Token::Greater => BinaryOp::Greater,
                Token::Less => BinaryOp::Less,
                Token::GreaterEqual => BinaryOp::GreaterEqual,
                Token::LessEqual => BinaryOp::LessEqual,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.comparison()?;
        while *self.current() == Token::And {
            self.bump();
            let right = self.comparison()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while *self.current() == Token::Or {
            self.bump();
            let right = self.and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let condition = self.or()?;
        if *self.current() != Token::Question {
            return Ok(condition);
        }
        self.bump();
        let then_branch = self.or()?;
        self.expect(Token::Colon)?;
        let else_branch = self.expr()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn parse(&mut self) -> Result<Expr, String> {
        let mut statements = vec![self.expr()?];
        while *self.current() == Token::Semicolon {
            self.bump();
            if *self.current() == Token::Eof {
                break;
            }
            statements.push(self.expr()?);
        }
        if *self.current() != Token::Eof {
            return Err(format!("Unexpected token after expression: {}", self.current()));
        }
        if statements.len() == 1 {
            Ok(statements.remove(0))
        } else {
            Ok(Expr::Sequence(statements))
        }
    }
}

pub fn parse_script(script: &str) -> Result<Expr, String> {
    let tokens = Tokenizer::new(script).tokenize()?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_operators() {
        let tokens = Tokenizer::new("&& || == != > < >= <= ! ;").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::And,
                Token::Or,
                Token::Equal,
                Token::NotEqual,
                Token::Greater,
                Token::Less,
                Token::GreaterEqual,
                Token::LessEqual,
                Token::Not,
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_single_ampersand_fails() {
        assert!(Tokenizer::new("a & b").tokenize().is_err());
    }

    #[test]
    fn test_parse_call() {
        let ast = parse_script("message(\"hello\")").unwrap();
        assert_eq!(
            ast,
            Expr::Call {
                name: "message".into(),
                args: vec![Expr::Str("hello".into())]
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let ast = parse_script("a || b && c").unwrap();
        match ast {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Or);
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ternary_and_sequence() {
        let ast = parse_script("$hp < 10 ? message('low') : message('ok'); handled()").unwrap();
        match ast {
            Expr::Sequence(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Expr::Ternary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_script("message('a') message('b')").is_err());
        assert!(parse_script("(message('a')").is_err());
    }
}
