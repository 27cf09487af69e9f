//! The lexer turns PostScript source text into a lazy stream of tokens.
//!
//! Tokens are the unit the scanner lifts into objects: names, literal names,
//! immediately-evaluated names, numbers, decoded strings (literal, hex, and
//! ASCII85 forms), comments, and the six structural delimiters.

use anyhow::anyhow;

use crate::{
    error::{PostScriptError, PsResult},
    file::decode_ascii85,
    stream::CharStream,
};

const BACKSPACE: u8 = b'\x08';
const FORM_FEED: u8 = b'\x0C';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Number,
    Name,
    LiteralName,
    ImmediatelyEvaluatedName,
    Comment,
    String,
    ArrayOpen,
    ArrayClose,
    DictionaryOpen,
    DictionaryClose,
    ProcedureOpen,
    ProcedureClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub content: Vec<u8>,
    pub span: Span,
}

/// A number literal, classified by the lexer's number grammar
///
/// Plain tokens match `[+-]?((\d+(\.\d*)?)|(\.\d+))([eE]-?\d+)?`; the radix
/// form `base#digits` accepts bases 2 through 36 and always yields an integer
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Integer(i64),
    Real(f64),
}

pub(crate) fn parse_number(bytes: &[u8]) -> Option<Number> {
    let s = std::str::from_utf8(bytes).ok()?;

    if let Some(hash) = s.find('#') {
        let (base, digits) = (&s[..hash], &s[hash + 1..]);

        if base.is_empty() || !base.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let base = base.parse::<u32>().ok()?;
        if !(2..=36).contains(&base) || digits.is_empty() {
            return None;
        }

        return i64::from_str_radix(digits, base).ok().map(Number::Integer);
    }

    if !matches_number_grammar(s.as_bytes()) {
        return None;
    }

    if s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-')) {
        // integral form; fall back to a real on 64-bit overflow
        if let Ok(n) = s.parse::<i64>() {
            return Some(Number::Integer(n));
        }
    }

    s.parse::<f64>().ok().map(Number::Real)
}

fn matches_number_grammar(s: &[u8]) -> bool {
    let mut i = 0;

    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_digits = s[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    i += int_digits;

    let mut frac_digits = 0;
    if s.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = s[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        i += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(s.get(i), Some(b'e' | b'E')) {
        i += 1;
        if s.get(i) == Some(&b'-') {
            i += 1;
        }

        let exp_digits = s[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits == 0 {
            return false;
        }
        i += exp_digits;
    }

    i == s.len()
}

#[derive(Debug, Clone)]
pub(crate) struct Lexer {
    stream: CharStream,
}

impl Lexer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            stream: CharStream::new(bytes),
        }
    }

    pub fn stream(&mut self) -> &mut CharStream {
        &mut self.stream
    }

    pub fn pos(&self) -> usize {
        self.stream.pos()
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.stream.at_end()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.stream.peek(0) {
            if !CharStream::is_whitespace(b) {
                break;
            }

            self.stream.advance(1);
        }
    }

    fn syntax_error(&self, from: usize) -> anyhow::Error {
        anyhow!(PostScriptError::SyntaxError {
            span: Some(Span {
                from,
                to: self.stream.pos(),
            }),
        })
    }

    pub fn next_token(&mut self) -> PsResult<Option<Token>> {
        self.skip_whitespace();

        let from = self.stream.pos();
        let token = |kind, content, to| Some(Token {
            kind,
            content,
            span: Span { from, to },
        });

        let b = match self.stream.peek(0) {
            Some(b) => b,
            None => return Ok(None),
        };

        Ok(match b {
            b'%' => {
                self.stream.advance(1);
                let content = self.stream.collect_until(|b| matches!(b, b'\r' | b'\n'));
                token(TokenKind::Comment, content, self.stream.pos())
            }
            b'/' => {
                self.stream.advance(1);
                let kind = if self.stream.peek(0) == Some(b'/') {
                    self.stream.advance(1);
                    TokenKind::ImmediatelyEvaluatedName
                } else {
                    TokenKind::LiteralName
                };
                let content = self.stream.collect_while(CharStream::is_regular);
                token(kind, content, self.stream.pos())
            }
            b'(' => {
                let content = self.lex_string(from)?;
                token(TokenKind::String, content, self.stream.pos())
            }
            b'<' => match self.stream.peek(1) {
                Some(b'<') => {
                    self.stream.advance(2);
                    token(TokenKind::DictionaryOpen, b"<<".to_vec(), self.stream.pos())
                }
                Some(b'~') => {
                    let content = self.lex_ascii85_string(from)?;
                    token(TokenKind::String, content, self.stream.pos())
                }
                _ => {
                    let content = self.lex_hex_string(from)?;
                    token(TokenKind::String, content, self.stream.pos())
                }
            },
            b'>' => {
                self.stream.advance(1);
                if self.stream.peek(0) != Some(b'>') {
                    return Err(self.syntax_error(from));
                }
                self.stream.advance(1);
                token(TokenKind::DictionaryClose, b">>".to_vec(), self.stream.pos())
            }
            b'[' => {
                self.stream.advance(1);
                token(TokenKind::ArrayOpen, b"[".to_vec(), self.stream.pos())
            }
            b']' => {
                self.stream.advance(1);
                token(TokenKind::ArrayClose, b"]".to_vec(), self.stream.pos())
            }
            b'{' => {
                self.stream.advance(1);
                token(TokenKind::ProcedureOpen, b"{".to_vec(), self.stream.pos())
            }
            b'}' => {
                self.stream.advance(1);
                token(TokenKind::ProcedureClose, b"}".to_vec(), self.stream.pos())
            }
            b')' => return Err(self.syntax_error(from)),
            _ => {
                let content = self.stream.collect_while(CharStream::is_regular);
                let kind = if parse_number(&content).is_some() {
                    TokenKind::Number
                } else {
                    TokenKind::Name
                };
                token(kind, content, self.stream.pos())
            }
        })
    }

    /// Literal string: balanced parentheses, backslash escapes, octal escapes,
    /// and backslash-newline line continuations
    fn lex_string(&mut self, from: usize) -> PsResult<Vec<u8>> {
        self.stream.advance(1);

        let mut content = Vec::new();
        let mut open_parens = 0u32;

        loop {
            let b = match self.stream.next_byte() {
                Some(b) => b,
                None => return Err(self.syntax_error(from)),
            };

            match b {
                b')' if open_parens == 0 => break,
                b')' => {
                    open_parens -= 1;
                    content.push(b')');
                }
                b'(' => {
                    open_parens += 1;
                    content.push(b'(');
                }
                b'\\' => match self.stream.next_byte() {
                    Some(b'n') => content.push(b'\n'),
                    Some(b'r') => content.push(b'\r'),
                    Some(b't') => content.push(b'\t'),
                    Some(b'b') => content.push(BACKSPACE),
                    Some(b'f') => content.push(FORM_FEED),
                    Some(b'\\') => content.push(b'\\'),
                    Some(b'(') => content.push(b'('),
                    Some(b')') => content.push(b')'),
                    Some(b'\n') => {}
                    Some(b'\r') => {
                        // line continuation swallows a full CRLF
                        if self.stream.peek(0) == Some(b'\n') {
                            self.stream.advance(1);
                        }
                    }
                    Some(c @ b'0'..=b'7') => {
                        let mut n = u32::from(c - b'0');

                        for _ in 0..2 {
                            match self.stream.peek(0) {
                                Some(d @ b'0'..=b'7') => {
                                    self.stream.advance(1);
                                    n = n * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }

                        content.push(n as u8);
                    }
                    // a backslash before any other character is dropped
                    Some(c) => content.push(c),
                    None => return Err(self.syntax_error(from)),
                },
                _ => content.push(b),
            }
        }

        Ok(content)
    }

    /// Hex string: whitespace is ignored, an odd trailing digit is padded
    /// with `0`
    fn lex_hex_string(&mut self, from: usize) -> PsResult<Vec<u8>> {
        self.stream.advance(1);

        let mut digits = Vec::new();

        loop {
            let b = match self.stream.next_byte() {
                Some(b) => b,
                None => return Err(self.syntax_error(from)),
            };

            match b {
                b'>' => break,
                b if CharStream::is_whitespace(b) => {}
                b if b.is_ascii_hexdigit() => digits.push(hex_digit(b)),
                _ => return Err(self.syntax_error(from)),
            }
        }

        if digits.len() % 2 == 1 {
            digits.push(0);
        }

        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    /// `<~ … ~>` base-85 string
    fn lex_ascii85_string(&mut self, from: usize) -> PsResult<Vec<u8>> {
        self.stream.advance(2);

        let mut encoded = Vec::new();

        loop {
            let b = match self.stream.next_byte() {
                Some(b) => b,
                None => return Err(self.syntax_error(from)),
            };

            if b == b'~' {
                if self.stream.next_byte() != Some(b'>') {
                    return Err(self.syntax_error(from));
                }
                break;
            }

            encoded.push(b);
        }

        decode_ascii85(&encoded).map_err(|_| self.syntax_error(from))
    }
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!("caller checked is_ascii_hexdigit"),
    }
}

impl Iterator for Lexer {
    type Item = PsResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(source: &[u8]) -> Vec<Token> {
        Lexer::new(source.to_vec())
            .collect::<PsResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn lexes_names_and_numbers() {
        let toks = tokens(b"add /lit //imm 12 -3.5 .5 1e-2 16#FFFE 8#1777");

        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::LiteralName,
                TokenKind::ImmediatelyEvaluatedName,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn number_grammar() {
        assert_eq!(parse_number(b"12"), Some(Number::Integer(12)));
        assert_eq!(parse_number(b"+7"), Some(Number::Integer(7)));
        assert_eq!(parse_number(b"-3.5"), Some(Number::Real(-3.5)));
        assert_eq!(parse_number(b".5"), Some(Number::Real(0.5)));
        assert_eq!(parse_number(b"4."), Some(Number::Real(4.0)));
        assert_eq!(parse_number(b"1e-2"), Some(Number::Real(0.01)));
        assert_eq!(parse_number(b"16#FFFE"), Some(Number::Integer(0xFFFE)));
        assert_eq!(parse_number(b"8#1777"), Some(Number::Integer(0o1777)));
        assert_eq!(parse_number(b"2#101"), Some(Number::Integer(5)));

        assert_eq!(parse_number(b"marks"), None);
        assert_eq!(parse_number(b"."), None);
        assert_eq!(parse_number(b"1e"), None);
        assert_eq!(parse_number(b"1e+3"), None);
        assert_eq!(parse_number(b"37#1"), None);
        assert_eq!(parse_number(b"1#2#3"), None);
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(br"(a\nb\t\(c\)\\ \101)");

        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].content, b"a\nb\t(c)\\ A");
    }

    #[test]
    fn string_balanced_parens() {
        let toks = tokens(b"(outer (inner) tail)");

        assert_eq!(toks[0].content, b"outer (inner) tail");
    }

    #[test]
    fn string_line_continuation() {
        let toks = tokens(b"(one\\\ntwo)");

        assert_eq!(toks[0].content, b"onetwo");
    }

    #[test]
    fn hex_string_pads_odd_digit() {
        let toks = tokens(b"<48 65 6C6C 6F2>");

        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].content, b"Hello ");
    }

    #[test]
    fn ascii85_string() {
        let toks = tokens(b"<~9jqo^~>");

        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].content, b"Man ");
    }

    #[test]
    fn dictionary_delimiters() {
        let toks = tokens(b"<< /a 1 >>");

        assert_eq!(toks[0].kind, TokenKind::DictionaryOpen);
        assert_eq!(toks.last().unwrap().kind, TokenKind::DictionaryClose);
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let toks = tokens(b"1 % a comment\n2");

        assert_eq!(toks[1].kind, TokenKind::Comment);
        assert_eq!(toks[1].content, b" a comment");
        assert_eq!(toks[2].content, b"2");
    }

    #[test]
    fn spans_track_source_positions() {
        let toks = tokens(b"ab (cd)");

        assert_eq!(toks[0].span, Span { from: 0, to: 2 });
        assert_eq!(toks[1].span, Span { from: 3, to: 7 });
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        let mut lexer = Lexer::new(b"(never closed".to_vec());

        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn unmatched_closing_angle_is_syntax_error() {
        let mut lexer = Lexer::new(b"> ".to_vec());

        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn invalid_hex_is_syntax_error() {
        let mut lexer = Lexer::new(b"<4g>".to_vec());

        assert!(lexer.next_token().is_err());
    }
}
