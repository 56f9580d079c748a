use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::InfoError;
use crate::types::BaseType;

/// One lexical token. Type keywords carry the base type they name, so the
/// lexer and the type system share a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Eof,
    StringConstant,
    IntegerConstant,
    FloatConstant,
    Identifier,
    Info,
    Struct,
    Enum,
    Union,
    Namespace,
    Main,
    BaseType(BaseType),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Equals,
    Dot,
}

impl Token {
    /// Human form used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Token::Eof => "end of file",
            Token::StringConstant => "string constant",
            Token::IntegerConstant => "integer constant",
            Token::FloatConstant => "float constant",
            Token::Identifier => "identifier",
            Token::Info => "info",
            Token::Struct => "struct",
            Token::Enum => "enum",
            Token::Union => "union",
            Token::Namespace => "namespace",
            Token::Main => "Main",
            Token::BaseType(base) => base.name(),
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Equals => "=",
            Token::Dot => ".",
        }
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Token> = {
        let mut map = HashMap::new();
        map.insert("info", Token::Info);
        map.insert("struct", Token::Struct);
        map.insert("enum", Token::Enum);
        map.insert("union", Token::Union);
        map.insert("namespace", Token::Namespace);
        map.insert("Main", Token::Main);
        for base in BaseType::ALL {
            if base.is_keyword() {
                map.insert(base.name(), Token::BaseType(base));
            }
        }
        map
    };
}

/// Single-pass scanner over one source. The text of the current identifier
/// or literal lands in `attribute`; `///` lines preceding the current token
/// accumulate in `doc_comment`.
pub struct Lexer<'a> {
    src: &'a [u8],
    cursor: usize,
    pub line: usize,
    pub attribute: String,
    pub doc_comment: String,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            src: source.as_bytes(),
            cursor: 0,
            line: 1,
            attribute: String::new(),
            doc_comment: String::new(),
        }
    }

    fn err(&self, msg: impl Into<String>) -> InfoError {
        InfoError::Parse {
            msg: msg.into(),
            line: self.line,
        }
    }

    fn peek(&self) -> u8 {
        self.src.get(self.cursor).copied().unwrap_or(0)
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.cursor]).into_owned()
    }

    pub fn next_token(&mut self) -> Result<Token, InfoError> {
        self.doc_comment.clear();
        let mut seen_newline = false;
        loop {
            if self.cursor >= self.src.len() {
                return Ok(Token::Eof);
            }
            let c = self.src[self.cursor];
            self.cursor += 1;
            match c {
                b' ' | b'\r' | b'\t' => {}
                b'\n' => {
                    self.line += 1;
                    seen_newline = true;
                }
                b'{' => return Ok(Token::LBrace),
                b'}' => return Ok(Token::RBrace),
                b'(' => return Ok(Token::LParen),
                b')' => return Ok(Token::RParen),
                b'[' => return Ok(Token::LBracket),
                b']' => return Ok(Token::RBracket),
                b',' => return Ok(Token::Comma),
                b':' => return Ok(Token::Colon),
                b';' => return Ok(Token::Semicolon),
                b'=' => return Ok(Token::Equals),
                b'.' => {
                    if !self.peek().is_ascii_digit() {
                        return Ok(Token::Dot);
                    }
                    return Err(self.err("Floating point constant can't start with \".\""));
                }
                b'"' => return self.string_constant(),
                b'/' if self.peek() == b'/' => {
                    self.cursor += 1;
                    let start = self.cursor;
                    while self.cursor < self.src.len() && self.src[self.cursor] != b'\n' {
                        self.cursor += 1;
                    }
                    if self.src.get(start) == Some(&b'/') {
                        // Documentation comment.
                        if !seen_newline {
                            return Err(
                                self.err("A documentation comment should be on a line on its own")
                            );
                        }
                        let line = String::from_utf8_lossy(&self.src[start + 1..self.cursor]);
                        self.doc_comment.push_str(&line);
                        self.doc_comment.push('\n');
                    }
                }
                _ if c.is_ascii_alphabetic() => {
                    let start = self.cursor - 1;
                    while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                        self.cursor += 1;
                    }
                    self.attribute = self.text(start);
                    if let Some(&token) = KEYWORDS.get(self.attribute.as_str()) {
                        return Ok(token);
                    }
                    // Boolean constants become integers, which simplifies
                    // everything downstream.
                    if self.attribute == "true" || self.attribute == "false" {
                        self.attribute = if self.attribute == "true" { "1" } else { "0" }.to_string();
                        return Ok(Token::IntegerConstant);
                    }
                    return Ok(Token::Identifier);
                }
                _ if c.is_ascii_digit() || c == b'-' => {
                    let start = self.cursor - 1;
                    while self.peek().is_ascii_digit() {
                        self.cursor += 1;
                    }
                    let token = if self.peek() == b'.' {
                        self.cursor += 1;
                        while self.peek().is_ascii_digit() {
                            self.cursor += 1;
                        }
                        Token::FloatConstant
                    } else {
                        Token::IntegerConstant
                    };
                    self.attribute = self.text(start);
                    return Ok(token);
                }
                _ => {
                    let printable = if c < b' ' || c > b'~' {
                        format!("code: {}", c)
                    } else {
                        (c as char).to_string()
                    };
                    return Err(self.err(format!("Illegal character: {}", printable)));
                }
            }
        }
    }

    fn string_constant(&mut self) -> Result<Token, InfoError> {
        let mut out: Vec<u8> = Vec::new();
        loop {
            let c = self.peek();
            if c == b'"' {
                self.cursor += 1;
                break;
            }
            if self.cursor >= self.src.len() || c < b' ' {
                return Err(self.err("Illegal character in string constant"));
            }
            if c == b'\\' {
                self.cursor += 1;
                let escaped = match self.peek() {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'"' => b'"',
                    b'\\' => b'\\',
                    _ => return Err(self.err("Unknown escape code in string constant")),
                };
                out.push(escaped);
                self.cursor += 1;
            } else {
                out.push(c);
                self.cursor += 1;
            }
        }
        self.attribute = String::from_utf8_lossy(&out).into_owned();
        Ok(Token::StringConstant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<(Token, String)> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().expect("lexing failed");
            let done = token == Token::Eof;
            out.push((token, lexer.attribute.clone()));
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_a_field() {
        let tokens = scan("x : int = 10 ;");
        assert_eq!(
            tokens.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![
                Token::Identifier,
                Token::Colon,
                Token::BaseType(BaseType::Int),
                Token::Equals,
                Token::IntegerConstant,
                Token::Semicolon,
                Token::Eof,
            ]
        );
        assert_eq!(tokens[0].1, "x");
        assert_eq!(tokens[4].1, "10");
    }

    #[test]
    fn booleans_become_integers() {
        let tokens = scan("true false");
        assert_eq!(tokens[0], (Token::IntegerConstant, "1".to_string()));
        assert_eq!(tokens[1], (Token::IntegerConstant, "0".to_string()));
    }

    #[test]
    fn negative_and_float_literals() {
        let tokens = scan("-5 3.25 7.");
        assert_eq!(tokens[0], (Token::IntegerConstant, "-5".to_string()));
        assert_eq!(tokens[1], (Token::FloatConstant, "3.25".to_string()));
        assert_eq!(tokens[2], (Token::FloatConstant, "7.".to_string()));
    }

    #[test]
    fn leading_dot_is_rejected() {
        let mut lexer = Lexer::new(".5");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Line 1: Floating point constant can't start with \".\""
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = scan(r#""a\tb\n\"q\"\\""#);
        assert_eq!(tokens[0], (Token::StringConstant, "a\tb\n\"q\"\\".to_string()));
    }

    #[test]
    fn unknown_escape_is_rejected() {
        let mut lexer = Lexer::new(r#""\x""#);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn comments_and_doc_comments() {
        let mut lexer = Lexer::new("// plain\n/// docs here\nname");
        let token = lexer.next_token().unwrap();
        assert_eq!(token, Token::Identifier);
        assert_eq!(lexer.attribute, "name");
        assert_eq!(lexer.doc_comment, " docs here\n");
        assert_eq!(lexer.line, 3);
    }

    #[test]
    fn consecutive_doc_lines_accumulate() {
        let mut lexer = Lexer::new("\n/// one\n/// two\nname");
        lexer.next_token().unwrap();
        assert_eq!(lexer.doc_comment, " one\n two\n");
    }

    #[test]
    fn doc_comment_must_start_a_line() {
        let mut lexer = Lexer::new("name /// trailing");
        lexer.next_token().unwrap();
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn illegal_character_reports_code() {
        let mut lexer = Lexer::new("@");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.to_string(), "Line 1: Illegal character: @");
    }
}
