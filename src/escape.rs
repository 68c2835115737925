//! String escaping and ECMAScript identifier classification.
//!
//! Pure functions shared by the tokenizer, the parser and the
//! serialization engine:
//!
//! - [`is_identifier_start`] / [`is_identifier_part`] classify Unicode
//!   code points against the ECMAScript identifier grammar, with the
//!   legacy [`EcmaMode::Ecma5`] mode restricted to the Basic
//!   Multilingual Plane
//! - [`escape_string`] produces the escaped body of a string literal for
//!   the active quote character
//! - [`escape_property_name`] validates a property name code point by
//!   code point and either emits it (legal pre-escaped `\u` sequences
//!   copied verbatim) or fails with a diagnostic listing every invalid
//!   code point
//! - [`unescape`] decodes a quoted-string body, pairing `\uD800..DBFF`
//!   high surrogates with the following low half
//!
//! Escapes are minimal-length: short forms (`\n`, `\t`, ...) where
//! defined, `\uXXXX` otherwise, and in [`EcmaMode::Ecma6`] the
//! `\u{X...}` code-point form for astral characters where it is shorter
//! than a surrogate pair.

use crate::options::{CodePointPolicy, EcmaMode, JsonConfig};
use crate::{Error, Result};

const ESCAPE: char = '\\';

/// Returns `true` if `c` may begin an ECMAScript identifier.
///
/// Start characters are Unicode letters, `$` and `_`. In
/// [`EcmaMode::Ecma5`] the character must additionally sit inside the
/// Basic Multilingual Plane.
///
/// # Examples
///
/// ```rust
/// use laxjson::{is_identifier_start, EcmaMode};
///
/// assert!(is_identifier_start('$', EcmaMode::Ecma5));
/// assert!(is_identifier_start('_', EcmaMode::Ecma6));
/// assert!(!is_identifier_start('7', EcmaMode::Ecma6));
/// assert!(!is_identifier_start('𝒜', EcmaMode::Ecma5));
/// assert!(is_identifier_start('𝒜', EcmaMode::Ecma6));
/// ```
#[must_use]
pub fn is_identifier_start(c: char, mode: EcmaMode) -> bool {
    if mode == EcmaMode::Ecma5 && (c as u32) > 0xFFFF {
        return false;
    }
    c == '$' || c == '_' || c.is_alphabetic()
}

/// Returns `true` if `c` may continue an ECMAScript identifier.
///
/// Part characters are the start set plus decimal digits, combining
/// marks, connector punctuation and the zero-width joiners.
#[must_use]
pub fn is_identifier_part(c: char, mode: EcmaMode) -> bool {
    if mode == EcmaMode::Ecma5 && (c as u32) > 0xFFFF {
        return false;
    }
    is_identifier_start(c, mode)
        || c.is_numeric()
        || is_combining_mark(c)
        || is_connector_punctuation(c)
        || c == '\u{200C}'
        || c == '\u{200D}'
}

// Combining mark blocks (Mn/Mc); the grammar admits them in part
// position so marks attached to a base letter survive.
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F
        | 0x0483..=0x0489
        | 0x0591..=0x05BD
        | 0x0610..=0x061A
        | 0x064B..=0x065F
        | 0x0900..=0x0903
        | 0x093A..=0x094F
        | 0x1AB0..=0x1AFF
        | 0x1DC0..=0x1DFF
        | 0x20D0..=0x20FF
        | 0xFE20..=0xFE2F)
}

// Connector punctuation (Pc) besides the low line, which is already a
// start character.
fn is_connector_punctuation(c: char) -> bool {
    matches!(c, '\u{203F}' | '\u{2040}' | '\u{2054}' | '\u{FE33}' | '\u{FE34}' | '\u{FF3F}')
}

/// Unicode noncharacters; the closest stable stand-in for "undefined
/// code point" that can be decided without a category database.
fn is_undefined_code_point(c: char) -> bool {
    let cp = c as u32;
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

/// Appends the minimal `\u` escape for `c` under the given mode.
fn push_unicode_escape(out: &mut String, c: char, mode: EcmaMode) {
    let cp = c as u32;
    if cp <= 0xFFFF {
        out.push_str(&format!("\\u{:04X}", cp));
    } else if mode == EcmaMode::Ecma6 {
        // \u{X...} is shorter than a surrogate pair for every astral
        // code point.
        out.push_str(&format!("\\u{{{:X}}}", cp));
    } else {
        let v = cp - 0x10000;
        let high = 0xD800 + (v >> 10);
        let low = 0xDC00 + (v & 0x3FF);
        out.push_str(&format!("\\u{:04X}\\u{:04X}", high, low));
    }
}

/// Escapes the body of a string literal for the configured quote
/// character.
///
/// Control characters, the backslash and the active quote are always
/// escaped. Undefined code points follow
/// [`JsonConfig::undefined_code_point`]: escaped under `PassThrough`,
/// substituted with U+FFFD under `Replace`, and fatal under `Fail`.
///
/// # Errors
///
/// [`Error::UndefinedCodePoint`] under the `Fail` policy.
///
/// # Examples
///
/// ```rust
/// use laxjson::{escape_string, JsonConfig};
///
/// let config = JsonConfig::default();
/// assert_eq!(escape_string("x\"y", &config).unwrap(), "x\\\"y");
/// assert_eq!(escape_string("tab\there", &config).unwrap(), "tab\\there");
/// ```
pub fn escape_string(s: &str, config: &JsonConfig) -> Result<String> {
    let quote = config.quote.as_char();
    let mut out = String::with_capacity(s.len() + 2);

    // Offsets report character positions, matching the tokenizer and
    // `unescape`.
    for (offset, c) in s.chars().enumerate() {
        match c {
            ESCAPE => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push(ESCAPE);
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\u{007F}' => {
                push_unicode_escape(&mut out, c, config.ecma_mode);
            }
            c if is_undefined_code_point(c) => match config.undefined_code_point {
                CodePointPolicy::PassThrough => {
                    push_unicode_escape(&mut out, c, config.ecma_mode);
                }
                CodePointPolicy::Replace => out.push('\u{FFFD}'),
                CodePointPolicy::Fail => {
                    return Err(Error::UndefinedCodePoint {
                        text: s.to_string(),
                        offset,
                        code_point: c as u32,
                    })
                }
            },
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Per-code-point classification used while validating a property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameChar {
    EscapeStart,
    ValidStart,
    ValidPart,
    Invalid,
}

/// Validates and emits a property name.
///
/// The name is walked code point by code point. Legal pre-escaped
/// `\uXXXX` / `\u{X...}` sequences are copied verbatim (the pass-through
/// rule), which is also how an astral character enters a name under the
/// legacy mode. On failure the error carries every invalid code point,
/// deduplicated in insertion order, and whether the first character
/// specifically was invalid.
///
/// # Errors
///
/// [`Error::BadPropertyName`] when any code point is neither a valid
/// identifier character nor part of a legal escape.
pub fn escape_property_name(name: &str, config: &JsonConfig) -> Result<String> {
    let mode = config.ecma_mode;
    let mut out = String::with_capacity(name.len());
    let mut invalid: Vec<u32> = Vec::new();
    let mut first_invalid = false;

    let chars: Vec<char> = name.chars().collect();
    let mut i = 0;
    let mut at_start = true;

    if chars.is_empty() {
        return Err(Error::BadPropertyName {
            rendered: "\"\"".to_string(),
            code_points: Vec::new(),
            first_invalid: true,
        });
    }

    while i < chars.len() {
        let c = chars[i];
        let class = if c == ESCAPE {
            NameChar::EscapeStart
        } else if at_start {
            if is_identifier_start(c, mode) {
                NameChar::ValidStart
            } else {
                NameChar::Invalid
            }
        } else if is_identifier_part(c, mode) {
            NameChar::ValidPart
        } else {
            NameChar::Invalid
        };

        match class {
            NameChar::EscapeStart => {
                match consume_name_escape(&chars, i) {
                    Some(end) => {
                        for &ec in &chars[i..end] {
                            out.push(ec);
                        }
                        i = end;
                        at_start = false;
                        continue;
                    }
                    None => {
                        if !invalid.contains(&(c as u32)) {
                            invalid.push(c as u32);
                        }
                        if at_start {
                            first_invalid = true;
                        }
                    }
                }
            }
            NameChar::ValidStart | NameChar::ValidPart => out.push(c),
            NameChar::Invalid => {
                if !invalid.contains(&(c as u32)) {
                    invalid.push(c as u32);
                }
                if at_start {
                    first_invalid = true;
                }
            }
        }
        at_start = false;
        i += 1;
    }

    if invalid.is_empty() {
        Ok(out)
    } else {
        Err(Error::BadPropertyName {
            rendered: printable_render(name),
            code_points: invalid,
            first_invalid,
        })
    }
}

// Returns the index one past a legal \uXXXX or \u{X...} escape starting
// at `start`, or None if the text there is not one.
fn consume_name_escape(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start) != Some(&ESCAPE) || chars.get(start + 1) != Some(&'u') {
        return None;
    }
    if chars.get(start + 2) == Some(&'{') {
        let mut i = start + 3;
        let mut digits = 0;
        while let Some(&c) = chars.get(i) {
            if c == '}' {
                return if digits > 0 && digits <= 6 { Some(i + 1) } else { None };
            }
            if !c.is_ascii_hexdigit() {
                return None;
            }
            digits += 1;
            i += 1;
        }
        None
    } else {
        let hex = chars.get(start + 2..start + 6)?;
        if hex.iter().all(|c| c.is_ascii_hexdigit()) {
            Some(start + 6)
        } else {
            None
        }
    }
}

/// Renders a name for diagnostics, eliding unprintable characters.
fn printable_render(name: &str) -> String {
    let body: String = name
        .chars()
        .filter(|c| !c.is_control() && !is_undefined_code_point(*c))
        .collect();
    format!("\"{}\"", body)
}

/// Decodes the body of a quoted string literal.
///
/// Recognized short escapes are decoded; `\uXXXX` escapes are decoded
/// with eager surrogate pairing (a high half must be followed by an
/// escaped low half); `\u{X...}` code-point escapes are accepted in any
/// mode on input. An unknown escape is preserved literally, backslash
/// included — lenient input is the point of this codec.
///
/// # Errors
///
/// - [`Error::UnmatchedSurrogate`] for a lone half under the `Fail`
///   policy (the `Replace` policy substitutes U+FFFD, `PassThrough`
///   keeps the escape text verbatim)
/// - [`Error::UndefinedCodePoint`] for a decoded noncharacter under the
///   `Fail` policy
/// - [`Error::Lexical`] for a syntactically malformed `\u` escape
pub fn unescape(s: &str, config: &JsonConfig) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != ESCAPE {
            out.push(c);
            i += 1;
            continue;
        }
        let Some(&next) = chars.get(i + 1) else {
            return Err(Error::lexical("\\", i));
        };
        match next {
            '"' | '\'' | '\\' | '/' => {
                out.push(next);
                i += 2;
            }
            'b' => {
                out.push('\u{0008}');
                i += 2;
            }
            'f' => {
                out.push('\u{000C}');
                i += 2;
            }
            'n' => {
                out.push('\n');
                i += 2;
            }
            'r' => {
                out.push('\r');
                i += 2;
            }
            't' => {
                out.push('\t');
                i += 2;
            }
            'u' => {
                i = decode_unicode_escape(&chars, i, s, config, &mut out)?;
            }
            other => {
                // Unknown escape: preserved literally.
                out.push(ESCAPE);
                out.push(other);
                i += 2;
            }
        }
    }

    Ok(out)
}

// Decodes one \u escape starting at `start` (pointing at the
// backslash), appending to `out` and returning the next index.
fn decode_unicode_escape(
    chars: &[char],
    start: usize,
    text: &str,
    config: &JsonConfig,
    out: &mut String,
) -> Result<usize> {
    if chars.get(start + 2) == Some(&'{') {
        let end = consume_name_escape(chars, start)
            .ok_or_else(|| Error::lexical(render_span(chars, start), start))?;
        let hex: String = chars[start + 3..end - 1].iter().collect();
        let cp = u32::from_str_radix(&hex, 16)
            .map_err(|_| Error::lexical(render_span(chars, start), start))?;
        push_code_point(cp, text, start, config, out)?;
        return Ok(end);
    }

    let unit = read_hex4(chars, start + 2)
        .ok_or_else(|| Error::lexical(render_span(chars, start), start))?;

    if (0xD800..=0xDBFF).contains(&unit) {
        // High surrogate: the low half must follow as another escape.
        let low_ok = chars.get(start + 6) == Some(&ESCAPE) && chars.get(start + 7) == Some(&'u');
        let low = if low_ok { read_hex4(chars, start + 8) } else { None };
        match low {
            Some(low) if (0xDC00..=0xDFFF).contains(&low) => {
                let cp = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                push_code_point(cp, text, start, config, out)?;
                Ok(start + 12)
            }
            _ => handle_lone_surrogate(unit, text, start, config, out).map(|()| start + 6),
        }
    } else if (0xDC00..=0xDFFF).contains(&unit) {
        handle_lone_surrogate(unit, text, start, config, out).map(|()| start + 6)
    } else {
        push_code_point(unit, text, start, config, out)?;
        Ok(start + 6)
    }
}

fn handle_lone_surrogate(
    unit: u32,
    text: &str,
    offset: usize,
    config: &JsonConfig,
    out: &mut String,
) -> Result<()> {
    match config.unmatched_surrogate {
        CodePointPolicy::PassThrough => {
            out.push_str(&format!("\\u{:04X}", unit));
            Ok(())
        }
        CodePointPolicy::Replace => {
            out.push('\u{FFFD}');
            Ok(())
        }
        CodePointPolicy::Fail => Err(Error::UnmatchedSurrogate {
            text: text.to_string(),
            offset,
            units: vec![unit as u16],
        }),
    }
}

fn push_code_point(
    cp: u32,
    text: &str,
    offset: usize,
    config: &JsonConfig,
    out: &mut String,
) -> Result<()> {
    // A braced escape can spell a surrogate half directly; that is an
    // unmatched-surrogate condition, not an undefined code point.
    if (0xD800..=0xDFFF).contains(&cp) {
        return handle_lone_surrogate(cp, text, offset, config, out);
    }
    match char::from_u32(cp) {
        Some(c) if is_undefined_code_point(c) => match config.undefined_code_point {
            CodePointPolicy::PassThrough => {
                out.push(c);
                Ok(())
            }
            CodePointPolicy::Replace => {
                out.push('\u{FFFD}');
                Ok(())
            }
            CodePointPolicy::Fail => Err(Error::UndefinedCodePoint {
                text: text.to_string(),
                offset,
                code_point: cp,
            }),
        },
        Some(c) => {
            out.push(c);
            Ok(())
        }
        None => Err(Error::UndefinedCodePoint {
            text: text.to_string(),
            offset,
            code_point: cp,
        }),
    }
}

fn read_hex4(chars: &[char], start: usize) -> Option<u32> {
    let hex = chars.get(start..start + 4)?;
    if !hex.iter().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let s: String = hex.iter().collect();
    u32::from_str_radix(&s, 16).ok()
}

fn render_span(chars: &[char], start: usize) -> String {
    chars[start..chars.len().min(start + 10)].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::QuoteChar;

    fn config() -> JsonConfig {
        JsonConfig::default()
    }

    #[test]
    fn dollar_and_underscore_start_in_both_modes() {
        for mode in [EcmaMode::Ecma5, EcmaMode::Ecma6] {
            assert!(is_identifier_start('$', mode));
            assert!(is_identifier_start('_', mode));
            assert!(!is_identifier_start('3', mode));
        }
    }

    #[test]
    fn digits_are_part_but_not_start() {
        assert!(is_identifier_part('3', EcmaMode::Ecma5));
        assert!(!is_identifier_start('3', EcmaMode::Ecma5));
    }

    #[test]
    fn astral_identifier_chars_need_ecma6() {
        let c = '\u{1D49C}'; // MATHEMATICAL SCRIPT CAPITAL A
        assert!(!is_identifier_start(c, EcmaMode::Ecma5));
        assert!(is_identifier_start(c, EcmaMode::Ecma6));
    }

    #[test]
    fn escape_quotes_and_controls() {
        let cfg = config();
        assert_eq!(escape_string("x\"y", &cfg).unwrap(), "x\\\"y");
        assert_eq!(escape_string("a\nb\tc", &cfg).unwrap(), "a\\nb\\tc");
        assert_eq!(escape_string("back\\slash", &cfg).unwrap(), "back\\\\slash");
    }

    #[test]
    fn single_quote_mode_escapes_apostrophe_not_double() {
        let cfg = config().with_quote(QuoteChar::Single);
        assert_eq!(escape_string("it's", &cfg).unwrap(), "it\\'s");
        assert_eq!(escape_string("say \"hi\"", &cfg).unwrap(), "say \"hi\"");
    }

    #[test]
    fn control_char_gets_unicode_escape() {
        let cfg = config();
        assert_eq!(escape_string("\u{0001}", &cfg).unwrap(), "\\u0001");
    }

    #[test]
    fn noncharacter_policies() {
        let s = "a\u{FDD0}b";
        let pass = config();
        assert_eq!(escape_string(s, &pass).unwrap(), "a\\uFDD0b");

        let replace = config().with_undefined_code_point(CodePointPolicy::Replace);
        assert_eq!(escape_string(s, &replace).unwrap(), "a\u{FFFD}b");

        let fail = config().with_undefined_code_point(CodePointPolicy::Fail);
        assert!(matches!(
            escape_string(s, &fail),
            Err(Error::UndefinedCodePoint { code_point: 0xFDD0, .. })
        ));
    }

    #[test]
    fn ecma6_astral_escape_is_code_point_form() {
        let cfg = config().with_ecma_mode(EcmaMode::Ecma6);
        let mut out = String::new();
        push_unicode_escape(&mut out, '\u{1F600}', cfg.ecma_mode);
        assert_eq!(out, "\\u{1F600}");

        let mut legacy = String::new();
        push_unicode_escape(&mut legacy, '\u{1F600}', EcmaMode::Ecma5);
        assert_eq!(legacy, "\\uD83D\\uDE00");
    }

    #[test]
    fn property_name_valid() {
        let cfg = config();
        assert_eq!(escape_property_name("foo_bar$1", &cfg).unwrap(), "foo_bar$1");
    }

    #[test]
    fn property_name_pre_escaped_astral_allowed() {
        let cfg = config();
        assert_eq!(
            escape_property_name("a\\uD835\\uDC9Cb", &cfg).unwrap(),
            "a\\uD835\\uDC9Cb"
        );
    }

    #[test]
    fn property_name_collects_invalid_code_points() {
        let cfg = config();
        let err = escape_property_name("9a-b-c", &cfg).unwrap_err();
        match err {
            Error::BadPropertyName {
                code_points,
                first_invalid,
                ..
            } => {
                assert_eq!(code_points, vec!['9' as u32, '-' as u32]);
                assert!(first_invalid);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn property_name_astral_rejected_in_legacy_mode() {
        let cfg = config();
        assert!(escape_property_name("a𝒜", &cfg).is_err());
        let ecma6 = config().with_ecma_mode(EcmaMode::Ecma6);
        assert!(escape_property_name("a𝒜", &ecma6).is_ok());
    }

    #[test]
    fn unescape_round_trips_escape_string() {
        let cfg = config();
        for s in ["plain", "with \"quotes\"", "tab\tnewline\n", "back\\slash", "\u{0007}bell"] {
            let escaped = escape_string(s, &cfg).unwrap();
            assert_eq!(unescape(&escaped, &cfg).unwrap(), s, "input {s:?}");
        }
    }

    #[test]
    fn unescape_pairs_surrogates() {
        let cfg = config();
        assert_eq!(unescape("\\uD83D\\uDE00", &cfg).unwrap(), "😀");
    }

    #[test]
    fn unescape_code_point_form() {
        let cfg = config();
        assert_eq!(unescape("\\u{1F600}", &cfg).unwrap(), "😀");
    }

    #[test]
    fn lone_surrogate_policies() {
        let pass = config();
        assert_eq!(unescape("\\uD800x", &pass).unwrap(), "\\uD800x");

        let replace = config().with_unmatched_surrogate(CodePointPolicy::Replace);
        assert_eq!(unescape("\\uD800x", &replace).unwrap(), "\u{FFFD}x");

        let fail = config().with_unmatched_surrogate(CodePointPolicy::Fail);
        assert!(matches!(
            unescape("\\uD800x", &fail),
            Err(Error::UnmatchedSurrogate { .. })
        ));
    }

    #[test]
    fn undefined_code_point_offset_counts_characters() {
        // "é" is two bytes; a byte-based offset would report 6.
        let fail = config().with_undefined_code_point(CodePointPolicy::Fail);
        match escape_string("héllo\u{FDD0}", &fail) {
            Err(Error::UndefinedCodePoint { offset, code_point, .. }) => {
                assert_eq!(offset, 5);
                assert_eq!(code_point, 0xFDD0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn braced_lone_surrogate_follows_surrogate_policy() {
        let replace = config().with_unmatched_surrogate(CodePointPolicy::Replace);
        assert_eq!(unescape("\\u{D800}x", &replace).unwrap(), "\u{FFFD}x");

        let fail = config().with_unmatched_surrogate(CodePointPolicy::Fail);
        assert!(matches!(
            unescape("\\u{D800}x", &fail),
            Err(Error::UnmatchedSurrogate { .. })
        ));

        let pass = config();
        assert_eq!(unescape("\\u{DFFF}x", &pass).unwrap(), "\\uDFFFx");
    }

    #[test]
    fn unknown_escape_preserved() {
        let cfg = config();
        assert_eq!(unescape("\\q", &cfg).unwrap(), "\\q");
    }
}
