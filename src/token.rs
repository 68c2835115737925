//! Lexical analysis of lenient JSON text.
//!
//! The [`Tokenizer`] consumes a character stream and produces one
//! [`Token`] per [`Tokenizer::next_token`] call. It accepts a superset
//! of strict JSON:
//!
//! - strings quoted with either `"` or `'`
//! - bare identifiers as object keys
//! - `new Date(...)` literals
//! - the `undefined` keyword
//!
//! The tokenizer holds no state beyond the current position and a
//! one-token lookahead: when a bare word is terminated by a structural
//! character, that structural token is buffered and returned on the
//! following call.
//!
//! Quoted-string termination uses the escape-run rule: a quote character
//! ends the string only when the run of immediately preceding
//! backslashes has even length (an odd run means the quote itself was
//! escaped). Escapes are *not* decoded here — the token carries the raw
//! body and decoding happens in [`crate::escape::unescape`].

use crate::{Error, Result};

/// Keyword literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    True,
    False,
    Null,
    /// JavaScript `undefined`; the parser maps it to [`crate::Value::Null`].
    Undefined,
}

/// A lexical token. Structural tokens carry no payload; textual tokens
/// carry the raw (undecoded) source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Comma,
    Colon,
    /// Quoted string body, outer quotes stripped, escapes intact.
    Str(String),
    /// Integer text, possibly exceeding `i64` range.
    Int(String),
    /// Floating-point text (contains `.` or an exponent).
    Float(String),
    Literal(Literal),
    /// Bare identifier (valid only in key position).
    Ident(String),
    /// The argument text of a `new Date(...)` literal.
    Date(String),
}

impl Token {
    /// Short description used in expected-vs-actual diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Token::StartObject => "'{'",
            Token::EndObject => "'}'",
            Token::StartArray => "'['",
            Token::EndArray => "']'",
            Token::Comma => "','",
            Token::Colon => "':'",
            Token::Str(_) => "string",
            Token::Int(_) => "integer",
            Token::Float(_) => "number",
            Token::Literal(_) => "literal",
            Token::Ident(_) => "identifier",
            Token::Date(_) => "date",
        }
    }
}

const ESCAPE: char = '\\';

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ',' | ':')
}

fn structural_token(c: char) -> Token {
    match c {
        '{' => Token::StartObject,
        '}' => Token::EndObject,
        '[' => Token::StartArray,
        ']' => Token::EndArray,
        ',' => Token::Comma,
        ':' => Token::Colon,
        _ => unreachable!("not a structural character"),
    }
}

/// Streaming tokenizer over lenient JSON text.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    lookahead: Option<Token>,
}

impl Tokenizer {
    /// Creates a tokenizer over the given text.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Tokenizer {
            chars: input.chars().collect(),
            pos: 0,
            lookahead: None,
        }
    }

    /// Current character offset, for error reporting.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Produces the next token, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// [`Error::Lexical`] for unterminated strings and for accumulated
    /// text that matches no token class.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(token) = self.lookahead.take() {
            return Ok(Some(token));
        }

        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        if is_structural(c) {
            self.pos += 1;
            return Ok(Some(structural_token(c)));
        }

        if c == '"' || c == '\'' {
            let body = self.read_quoted(c)?;
            return Ok(Some(Token::Str(body)));
        }

        self.read_bare_word().map(Some)
    }

    // Reads a quoted string, returning the body with escapes intact.
    // The opening quote has been peeked but not consumed.
    fn read_quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut body = String::new();
        let mut escape_run = 0usize;

        while let Some(c) = self.bump() {
            if c == quote && escape_run % 2 == 0 {
                return Ok(body);
            }
            if c == ESCAPE {
                escape_run += 1;
            } else {
                escape_run = 0;
            }
            body.push(c);
        }

        Err(Error::lexical(
            format!("{}{}", quote, body),
            start,
        ))
    }

    // Accumulates a bare word up to a structural character outside any
    // embedded quoted region, buffers that structural token, and
    // classifies the accumulated text.
    fn read_bare_word(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if is_structural(c) {
                self.pos += 1;
                self.lookahead = Some(structural_token(c));
                break;
            }
            if c == '"' || c == '\'' {
                // Embedded quoted region, copied verbatim including
                // its quotes.
                let body = self.read_quoted(c)?;
                text.push(c);
                text.push_str(&body);
                text.push(c);
                continue;
            }
            text.push(c);
            self.pos += 1;
        }

        let trimmed = text.trim_end();
        classify(trimmed, start)
    }
}

// Classification order: date literal, float, integer, keyword literal,
// bare identifier. No match is a lexical error.
fn classify(text: &str, offset: usize) -> Result<Token> {
    if let Some(inner) = match_date_literal(text) {
        return Ok(Token::Date(inner.to_string()));
    }
    if is_float_text(text) {
        return Ok(Token::Float(text.to_string()));
    }
    if is_int_text(text) {
        return Ok(Token::Int(text.to_string()));
    }
    match text {
        "true" => return Ok(Token::Literal(Literal::True)),
        "false" => return Ok(Token::Literal(Literal::False)),
        "null" => return Ok(Token::Literal(Literal::Null)),
        "undefined" => return Ok(Token::Literal(Literal::Undefined)),
        _ => {}
    }
    if is_identifier_text(text) {
        return Ok(Token::Ident(text.to_string()));
    }
    Err(Error::lexical(text, offset))
}

// `new Date( ... )`, whitespace tolerated after `new`.
fn match_date_literal(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("new")?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("Date")?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.strip_suffix(')')?;
    Some(rest.trim())
}

fn is_int_text(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_float_text(text: &str) -> bool {
    if !text.contains(['.', 'e', 'E']) {
        return false;
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return false;
    }
    text.parse::<f64>().is_ok()
}

fn is_identifier_text(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    // Lexing is permissive (Ecma6 set); output-side validation applies
    // the configured strictness.
    crate::escape::is_identifier_start(first, crate::EcmaMode::Ecma6)
        && chars.all(|c| crate::escape::is_identifier_part(c, crate::EcmaMode::Ecma6))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(input);
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn structural_punctuation() {
        assert_eq!(
            all_tokens("{}[],:"),
            vec![
                Token::StartObject,
                Token::EndObject,
                Token::StartArray,
                Token::EndArray,
                Token::Comma,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn strings_with_either_quote() {
        assert_eq!(all_tokens(r#""abc""#), vec![Token::Str("abc".to_string())]);
        assert_eq!(all_tokens("'abc'"), vec![Token::Str("abc".to_string())]);
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        assert_eq!(
            all_tokens(r#""x\"y""#),
            vec![Token::Str(r#"x\"y"#.to_string())]
        );
        // Even escape run before the quote: the backslash is escaped,
        // the quote terminates.
        assert_eq!(
            all_tokens(r#""x\\""#),
            vec![Token::Str(r"x\\".to_string())]
        );
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let mut tokenizer = Tokenizer::new("\"abc");
        assert!(matches!(
            tokenizer.next_token(),
            Err(Error::Lexical { .. })
        ));
    }

    #[test]
    fn numbers_and_literals() {
        assert_eq!(all_tokens("42"), vec![Token::Int("42".to_string())]);
        assert_eq!(all_tokens("-7"), vec![Token::Int("-7".to_string())]);
        assert_eq!(all_tokens("3.25"), vec![Token::Float("3.25".to_string())]);
        assert_eq!(all_tokens("1e10"), vec![Token::Float("1e10".to_string())]);
        assert_eq!(all_tokens("true"), vec![Token::Literal(Literal::True)]);
        assert_eq!(all_tokens("undefined"), vec![Token::Literal(Literal::Undefined)]);
    }

    #[test]
    fn oversized_integer_still_lexes_as_int() {
        assert_eq!(
            all_tokens("99999999999999999999"),
            vec![Token::Int("99999999999999999999".to_string())]
        );
    }

    #[test]
    fn bare_identifier_key() {
        assert_eq!(
            all_tokens("{abc:1}"),
            vec![
                Token::StartObject,
                Token::Ident("abc".to_string()),
                Token::Colon,
                Token::Int("1".to_string()),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn date_literal() {
        assert_eq!(
            all_tokens("new Date(1234567890)"),
            vec![Token::Date("1234567890".to_string())]
        );
    }

    #[test]
    fn lookahead_preserves_structural_terminator() {
        // The ']' terminating the bare word must come out on the next
        // call, not be swallowed.
        assert_eq!(
            all_tokens("[1,true]"),
            vec![
                Token::StartArray,
                Token::Int("1".to_string()),
                Token::Comma,
                Token::Literal(Literal::True),
                Token::EndArray,
            ]
        );
    }

    #[test]
    fn unrecognized_text_reports_offset() {
        let mut tokenizer = Tokenizer::new("  @@@");
        match tokenizer.next_token() {
            Err(Error::Lexical { text, offset }) => {
                assert_eq!(text, "@@@");
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn trailing_whitespace_trimmed_from_bare_word() {
        assert_eq!(
            all_tokens("[true ]"),
            vec![
                Token::StartArray,
                Token::Literal(Literal::True),
                Token::EndArray,
            ]
        );
    }
}
