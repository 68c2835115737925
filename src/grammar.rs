//! Lenient JSON Grammar
//!
//! This module documents the grammar accepted by the parser and the
//! normalization rules applied by the writer.
//!
//! # Overview
//!
//! The input language is a superset of JSON (RFC 8259). Every strict
//! JSON document parses to the same tree a strict parser would produce;
//! the extensions below are additionally accepted. Output is strict
//! JSON by default, so the codec also works as a normalizer from the
//! relaxed dialect to the interchange dialect.
//!
//! # Structural tokens
//!
//! `{` `}` `[` `]` `,` `:` delimit objects and arrays exactly as in
//! JSON. A trailing comma before `}` or `]` is tolerated:
//!
//! ```text
//! {a: 1, b: 2,}      [1, 2, 3,]
//! ```
//!
//! # Strings
//!
//! Strings may be quoted with `"` or `'`. The active quote must be
//! escaped inside the string body; the other quote may appear bare. A
//! quote preceded by an odd-length run of backslashes is escaped and
//! does not terminate the string.
//!
//! Recognized escapes: `\b \t \n \f \r \\`, the active quote,
//! `\uXXXX`, and the ECMAScript 6 form `\u{X...}` (one to six hex
//! digits). An unrecognized escape is preserved literally. A high
//! surrogate escape immediately followed by a low surrogate escape
//! decodes as one astral character; an unpaired surrogate is subject to
//! the configured policy.
//!
//! # Property names
//!
//! Object keys may be quoted strings or bare identifiers. A bare
//! identifier starts with a letter, `_`, or `$`, and continues with
//! those plus digits, combining marks, connector punctuation, and the
//! zero-width (non-)joiners, following the ECMAScript identifier
//! grammar. Under ECMAScript 5 rules all identifier characters must lie
//! in the Basic Multilingual Plane; ECMAScript 6 rules admit astral
//! characters.
//!
//! # Numbers
//!
//! | Form | Example | Parses to |
//! |------|---------|-----------|
//! | Integer within `i64` | `42` | `Value::Int` |
//! | Integer beyond `i64` | `99999999999999999999` | `Value::BigInt` |
//! | Decimal `f64` reproduces | `3.25` | `Value::Float` |
//! | Decimal `f64` would round | `3.14159265358979323846` | `Value::BigDecimal` |
//!
//! Widening on overflow is governed by the precision-preservation
//! switches in [`JsonConfig`](crate::JsonConfig); with preservation off
//! everything collapses to `f64`.
//!
//! # Keyword literals
//!
//! `true`, `false`, and `null` as in JSON. `undefined` is accepted and
//! maps to null.
//!
//! # Date literals
//!
//! `new Date(1234567890123)` with an epoch-millisecond argument, or
//! `new Date('2024-01-15T10:30:00Z')` with a quoted RFC 3339 timestamp.
//! The writer always emits the millisecond form.
//!
//! # Classification order
//!
//! A bare word (any run of non-structural text outside quotes) is
//! classified as, in order: date literal, float, integer, keyword
//! literal, bare identifier. Text matching none of these is a lexical
//! error carrying the offending text and its offset.
//!
//! # Writer normalization
//!
//! - Keys and strings are quoted with the configured quote character
//! - Control characters use short escapes where they exist, `\uXXXX`
//!   otherwise; astral escapes use surrogate pairs under ECMAScript 5
//!   syntax and `\u{X...}` under ECMAScript 6
//! - Whole floats keep a decimal marker (`2.0`) so they re-parse as
//!   floats
//! - Non-finite floats have no JSON spelling and emit `null`
//! - Object key order is insertion order, preserved exactly
