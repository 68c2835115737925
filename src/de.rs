//! Parsing lenient JSON into [`Value`] trees and Rust data structures.
//!
//! ## Overview
//!
//! The [`Parser`] is a recursive-descent parser over the token stream:
//!
//! - **Single-pass parsing**: one token of lookahead, no backtracking
//! - **Lenient grammar**: trailing commas, either quote style, bare
//!   identifier keys, `new Date(...)` literals
//! - **Precision preservation**: integers outside `i64` range become
//!   [`Value::BigInt`]; decimal text that `f64` cannot represent
//!   exactly becomes [`Value::BigDecimal`]
//! - **Error reporting**: expected-vs-actual diagnostics with character
//!   offsets
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use laxjson::from_str;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Data { x: i32, y: i32 }
//!
//! let data: Data = from_str("{x: 1, 'y': 2,}").unwrap();
//! assert_eq!(data, Data { x: 1, y: 2 });
//! ```

use std::io;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::de::DeserializeOwned;
use serde::{de, forward_to_deserialize_any};

use crate::escape::unescape;
use crate::options::DuplicateKeys;
use crate::token::{Literal, Token, Tokenizer};
use crate::{Error, JsonConfig, JsonMap, Result, Value};

/// Parses lenient JSON text into a [`Value`] with the default
/// configuration.
///
/// # Errors
///
/// Lexical, syntax, and policy errors per [`Error`].
pub fn parse_str(input: &str) -> Result<Value> {
    parse_str_with_config(input, &JsonConfig::default())
}

/// Parses lenient JSON text into a [`Value`] with an explicit
/// configuration.
///
/// # Errors
///
/// Lexical, syntax, and policy errors per [`Error`].
pub fn parse_str_with_config(input: &str, config: &JsonConfig) -> Result<Value> {
    Parser::new(input, config).parse()
}

/// Reads all input from `reader` and parses it with the default
/// configuration.
///
/// # Errors
///
/// [`Error::Io`] if reading fails, otherwise as [`parse_str`].
pub fn parse_reader<R: io::Read>(reader: R) -> Result<Value> {
    parse_reader_with_config(reader, &JsonConfig::default())
}

/// Reads all input from `reader` and parses it with an explicit
/// configuration.
///
/// # Errors
///
/// [`Error::Io`] if reading fails, otherwise as [`parse_str`].
pub fn parse_reader_with_config<R: io::Read>(mut reader: R, config: &JsonConfig) -> Result<Value> {
    let mut input = String::new();
    reader.read_to_string(&mut input).map_err(Error::io)?;
    parse_str_with_config(&input, config)
}

/// Deserializes a `T` from lenient JSON text.
///
/// # Errors
///
/// Parse errors, or [`Error::Message`] if the parsed value does not fit
/// `T`.
pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    from_value(parse_str(input)?)
}

/// Deserializes a `T` from lenient JSON bytes.
///
/// # Errors
///
/// [`Error::Message`] on invalid UTF-8, otherwise as [`from_str`].
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let input = std::str::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))?;
    from_str(input)
}

/// Deserializes a `T` from an I/O stream of lenient JSON.
///
/// # Errors
///
/// [`Error::Io`] if reading fails, otherwise as [`from_str`].
pub fn from_reader<R: io::Read, T: DeserializeOwned>(reader: R) -> Result<T> {
    from_value(parse_reader(reader)?)
}

/// Deserializes a `T` from an already-parsed [`Value`].
///
/// # Errors
///
/// [`Error::Message`] if the value does not fit `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Recursive-descent parser over the lenient JSON token stream.
pub struct Parser<'a> {
    tokenizer: Tokenizer,
    config: &'a JsonConfig,
    depth: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &str, config: &'a JsonConfig) -> Self {
        Parser {
            tokenizer: Tokenizer::new(input),
            config,
            depth: 0,
        }
    }

    /// Parses a single top-level value and requires end of input after
    /// it.
    ///
    /// # Errors
    ///
    /// [`Error::Syntax`] on trailing tokens, plus all value-level
    /// errors.
    pub fn parse(mut self) -> Result<Value> {
        let token = self.next_required("value")?;
        let value = self.parse_value(token)?;
        match self.tokenizer.next_token()? {
            None => Ok(value),
            Some(trailing) => Err(Error::syntax(
                "end of input",
                trailing.describe(),
                self.tokenizer.offset(),
            )),
        }
    }

    fn next_required(&mut self, expected: &str) -> Result<Token> {
        self.tokenizer.next_token()?.ok_or_else(|| {
            Error::syntax(expected, "end of input", self.tokenizer.offset())
        })
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(Error::DepthExceeded(self.config.max_depth));
        }
        Ok(())
    }

    fn parse_value(&mut self, token: Token) -> Result<Value> {
        match token {
            Token::StartObject => self.parse_object(),
            Token::StartArray => self.parse_array(),
            Token::Str(body) => Ok(Value::String(unescape(&body, self.config)?)),
            Token::Int(text) => self.parse_int(&text),
            Token::Float(text) => self.parse_float(&text),
            Token::Literal(Literal::True) => Ok(Value::Bool(true)),
            Token::Literal(Literal::False) => Ok(Value::Bool(false)),
            Token::Literal(Literal::Null) | Token::Literal(Literal::Undefined) => Ok(Value::Null),
            Token::Date(inner) => self.parse_date(&inner),
            other => Err(Error::syntax(
                "value",
                other.describe(),
                self.tokenizer.offset(),
            )),
        }
    }

    // Integers that overflow i64 widen to BigInt when precision
    // preservation is on, and collapse to f64 otherwise.
    fn parse_int(&mut self, text: &str) -> Result<Value> {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        if self.config.preserve_int_precision {
            let big = BigInt::from_str(text).map_err(|_| {
                Error::syntax("integer", "malformed digits", self.tokenizer.offset())
            })?;
            Ok(Value::BigInt(big))
        } else {
            let f = text.parse::<f64>().map_err(|_| {
                Error::syntax("number", "malformed digits", self.tokenizer.offset())
            })?;
            Ok(Value::Float(f))
        }
    }

    // A decimal keeps its text-level value when f64 cannot reproduce
    // it: compare the source digits against the shortest representation
    // of the rounded double.
    fn parse_float(&mut self, text: &str) -> Result<Value> {
        let f = text.parse::<f64>().map_err(|_| {
            Error::syntax("number", "malformed digits", self.tokenizer.offset())
        })?;
        if self.config.preserve_decimal_precision {
            let exact = BigDecimal::from_str(text).map_err(|_| {
                Error::syntax("number", "malformed digits", self.tokenizer.offset())
            })?;
            let reproduced = f.is_finite()
                && BigDecimal::from_str(&f.to_string())
                    .map(|round_trip| round_trip == exact)
                    .unwrap_or(false);
            if !reproduced {
                return Ok(Value::BigDecimal(exact));
            }
        }
        Ok(Value::Float(f))
    }

    // `new Date(...)` accepts epoch milliseconds or a quoted RFC 3339
    // timestamp.
    fn parse_date(&mut self, inner: &str) -> Result<Value> {
        if let Ok(millis) = inner.parse::<i64>() {
            return match Utc.timestamp_millis_opt(millis) {
                chrono::LocalResult::Single(dt) => Ok(Value::Date(dt)),
                _ => Err(Error::syntax(
                    "epoch milliseconds",
                    "out-of-range timestamp",
                    self.tokenizer.offset(),
                )),
            };
        }
        let quoted = inner
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
        if let Some(text) = quoted {
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Ok(Value::Date(dt.with_timezone(&Utc)));
            }
        }
        Err(Error::syntax(
            "date argument",
            "unrecognized text",
            self.tokenizer.offset(),
        ))
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.enter()?;
        let mut map = JsonMap::new();
        loop {
            let token = self.next_required("property name or '}'")?;
            let key = match token {
                Token::EndObject => break,
                Token::Str(body) => unescape(&body, self.config)?,
                Token::Ident(name) => name,
                other => {
                    return Err(Error::syntax(
                        "property name or '}'",
                        other.describe(),
                        self.tokenizer.offset(),
                    ))
                }
            };
            if self.config.duplicate_keys == DuplicateKeys::Fail && map.contains_key(&key) {
                return Err(Error::DuplicateProperty(key));
            }

            match self.next_required("':'")? {
                Token::Colon => {}
                other => {
                    return Err(Error::syntax(
                        "':'",
                        other.describe(),
                        self.tokenizer.offset(),
                    ))
                }
            }

            let token = self.next_required("value")?;
            let value = self.parse_value(token)?;
            map.insert(key, value);

            match self.next_required("',' or '}'")? {
                Token::Comma => {}
                Token::EndObject => break,
                other => {
                    return Err(Error::syntax(
                        "',' or '}'",
                        other.describe(),
                        self.tokenizer.offset(),
                    ))
                }
            }
        }
        self.depth -= 1;
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.enter()?;
        let mut items = Vec::new();
        loop {
            let token = self.next_required("value or ']'")?;
            if token == Token::EndArray {
                break;
            }
            items.push(self.parse_value(token)?);
            match self.next_required("',' or ']'")? {
                Token::Comma => {}
                Token::EndArray => break,
                other => {
                    return Err(Error::syntax(
                        "',' or ']'",
                        other.describe(),
                        self.tokenizer.offset(),
                    ))
                }
            }
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: JsonMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            _ => Err(Error::custom("expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("expected newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(items)) => visitor.visit_seq(SeqDeserializer::new(items)),
            _ => Err(Error::custom("expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Object(map)) => visitor.visit_map(MapDeserializer::new(map)),
            _ => Err(Error::custom("expected struct variant")),
        }
    }
}

struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map)),
            // Wide numbers narrow when they fit, so numeric targets
            // keep working; otherwise the digits surface as a string.
            Value::BigInt(bi) => {
                if let Some(u) = bi.to_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = bi.to_i64() {
                    visitor.visit_i64(i)
                } else {
                    visitor.visit_string(bi.to_string())
                }
            }
            Value::BigDecimal(bd) => match bd.to_f64() {
                Some(f) if f.is_finite() => visitor.visit_f64(f),
                _ => visitor.visit_string(bd.to_string()),
            },
            Value::Date(dt) => visitor.visit_string(dt.to_rfc3339()),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            value => visitor.visit_some(ValueDeserializer::new(value)),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            // An externally tagged variant is a one-entry object.
            Value::Object(map) => {
                let mut iter = map.into_iter();
                let Some((variant, value)) = iter.next() else {
                    return Err(Error::custom("expected a variant object"));
                };
                if iter.next().is_some() {
                    return Err(Error::custom("expected a single-entry variant object"));
                }
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: Some(value),
                })
            }
            Value::String(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
            }),
            other => Err(Error::custom(format!(
                "expected enum, found {}",
                other.type_name()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CodePointPolicy;

    #[test]
    fn strict_object_parses() {
        let value = parse_str(r#"{"a":1,"b":"x\"y"}"#).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(map.get("b"), Some(&Value::String("x\"y".to_string())));
    }

    #[test]
    fn lenient_object_parses() {
        let value = parse_str("{a:1, 'b':[1,2,3],}").unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(
            map.get("b"),
            Some(&Value::Array(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3)
            ]))
        );
    }

    #[test]
    fn trailing_comma_in_array() {
        let value = parse_str("[1, 2, 3,]").unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn oversized_integer_widens_to_bigint() {
        let value = parse_str("99999999999999999999").unwrap();
        match value {
            Value::BigInt(bi) => assert_eq!(bi.to_string(), "99999999999999999999"),
            other => panic!("expected BigInt, got {other:?}"),
        }
    }

    #[test]
    fn oversized_integer_collapses_without_preservation() {
        let config = JsonConfig::default().with_preserve_int_precision(false);
        let value = parse_str_with_config("99999999999999999999", &config).unwrap();
        assert!(matches!(value, Value::Float(_)));
    }

    #[test]
    fn long_decimal_becomes_bigdecimal() {
        let value = parse_str("3.14159265358979323846264338327950288").unwrap();
        match value {
            Value::BigDecimal(bd) => {
                assert_eq!(bd.to_string(), "3.14159265358979323846264338327950288");
            }
            other => panic!("expected BigDecimal, got {other:?}"),
        }
    }

    #[test]
    fn representable_decimal_stays_f64() {
        assert_eq!(parse_str("3.25").unwrap(), Value::Float(3.25));
        assert_eq!(parse_str("0.1").unwrap(), Value::Float(0.1));
    }

    #[test]
    fn date_literal_from_millis() {
        let value = parse_str("new Date(0)").unwrap();
        match value {
            Value::Date(dt) => assert_eq!(dt.timestamp_millis(), 0),
            other => panic!("expected Date, got {other:?}"),
        }
    }

    #[test]
    fn undefined_maps_to_null() {
        assert_eq!(parse_str("[undefined]").unwrap(), Value::Array(vec![Value::Null]));
    }

    #[test]
    fn duplicate_keys_last_wins_by_default() {
        let value = parse_str("{a:1, a:2}").unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn duplicate_keys_can_fail() {
        let config = JsonConfig::default().with_duplicate_keys(DuplicateKeys::Fail);
        match parse_str_with_config("{a:1, a:2}", &config) {
            Err(Error::DuplicateProperty(key)) => assert_eq!(key, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_colon_is_syntax_error() {
        match parse_str("{\"a\" 1}") {
            Err(Error::Syntax { expected, .. }) => assert_eq!(expected, "':'"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn trailing_tokens_rejected() {
        match parse_str("[1] 2") {
            Err(Error::Syntax { expected, .. }) => assert_eq!(expected, "end of input"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bare_word_runs_to_structural_boundary() {
        // Interior whitespace stays inside a bare word (that is what
        // lets `new Date(0)` lex as one token), so these fail lexically
        // rather than as missing-punctuation syntax errors.
        match parse_str("{a 1}") {
            Err(Error::Lexical { text, offset }) => {
                assert_eq!(text, "a 1");
                assert_eq!(offset, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(parse_str("1 2"), Err(Error::Lexical { .. })));
    }

    #[test]
    fn depth_limit_enforced() {
        let mut input = String::new();
        for _ in 0..200 {
            input.push('[');
        }
        for _ in 0..200 {
            input.push(']');
        }
        assert!(matches!(parse_str(&input), Err(Error::DepthExceeded(128))));
    }

    #[test]
    fn undefined_code_point_policy_applies_to_strings() {
        let config = JsonConfig::default().with_undefined_code_point(CodePointPolicy::Fail);
        assert!(matches!(
            parse_str_with_config("\"\\uFDD0\"", &config),
            Err(Error::UndefinedCodePoint { .. })
        ));
    }

    #[test]
    fn reader_roundtrip() {
        let value = parse_reader(io::Cursor::new(b"{a: true}".to_vec())).unwrap();
        assert_eq!(
            value.as_object().unwrap().get("a"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn serde_struct_bridge() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Point {
            x: i64,
            y: Option<String>,
        }
        let point: Point = from_str("{x: 4, y: 'hi'}").unwrap();
        assert_eq!(
            point,
            Point {
                x: 4,
                y: Some("hi".to_string())
            }
        );
        let point: Point = from_str("{x: 4, y: null}").unwrap();
        assert_eq!(point, Point { x: 4, y: None });
    }
}
