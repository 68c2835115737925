//! Error types for JSON serialization and parsing.
//!
//! Every failure mode of the codec maps to one variant of [`Error`], each
//! carrying the minimal diagnostic payload needed to reproduce the input:
//! lexical errors carry the offending text and stream offset, syntax errors
//! carry expected-vs-actual token kinds, loop detection carries a snapshot
//! of the recursion path.
//!
//! The rendered message text is not a compatibility surface; programs that
//! need to dispatch on failures should match on the variant or use
//! [`Error::kind`]. A minimal message catalog keyed by [`ErrorKind`] and
//! [`Locale`] backs localized summaries.
//!
//! ## Examples
//!
//! ```rust
//! use laxjson::{parse_str, Error};
//!
//! let err = parse_str("{broken").unwrap_err();
//! assert!(matches!(err, Error::Syntax { .. }));
//! ```

use std::fmt;
use thiserror::Error;

/// One frame of the serializer's recursion path, captured when a data
/// structure loop is detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopFrame {
    /// Type name of the value at this frame.
    pub type_name: String,
    /// Identity (address) of the value at this frame.
    pub identity: usize,
}

/// Failures in the structural-reflection layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReflectionError {
    /// A registered accessor failed to produce a field value.
    #[error("field access failed: {0}")]
    Access(String),

    /// A field named in an explicit request does not exist and the
    /// caller asked for strict resolution.
    #[error("no such field: {0}")]
    NoSuchField(String),

    /// A type's field resolution recursively triggered resolution of the
    /// same type before the first pass completed. This is a type-graph
    /// cycle, distinct from a value-graph loop.
    #[error("recursive reflection of type {0}")]
    RecursiveReflection(String),

    /// The configured visibility level is not a valid threshold.
    #[error("invalid visibility level: {0}")]
    InvalidVisibility(String),
}

/// Represents all possible errors that can occur while serializing or
/// parsing JSON.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Unrecognized or malformed token text
    #[error("unrecognized token {text:?} at offset {offset}")]
    Lexical { text: String, offset: usize },

    /// Unexpected token kind where another was required
    #[error("expected {expected}, found {found} at offset {offset}")]
    Syntax {
        expected: String,
        found: String,
        offset: usize,
    },

    /// A property name failed identifier validation
    #[error("invalid property name {rendered}: bad code points {code_points:04X?} (first character invalid: {first_invalid})")]
    BadPropertyName {
        /// Printable rendering of the offending name, unprintable
        /// characters elided.
        rendered: String,
        /// Every invalid code point, deduplicated, insertion order.
        code_points: Vec<u32>,
        /// Whether the first character specifically was invalid.
        first_invalid: bool,
    },

    /// Two entries with the same string-converted key
    #[error("duplicate property {0:?}")]
    DuplicateProperty(String),

    /// A value-graph cycle was detected during serialization
    #[error("data structure loop detected at {type_name}; recursion path: {path}")]
    DataStructureLoop {
        /// Type name of the value that closed the cycle.
        type_name: String,
        /// Snapshot of the full recursion stack at detection time.
        frames: Vec<LoopFrame>,
        /// Index into `frames` of the frame the cycle re-entered.
        duplicate: usize,
        /// Pre-rendered path with the duplicate frame marked.
        path: String,
    },

    /// An unassigned code point was encountered under the Fail policy
    #[error("undefined code point U+{code_point:04X} at offset {offset} in {text:?}")]
    UndefinedCodePoint {
        text: String,
        offset: usize,
        code_point: u32,
    },

    /// A lone UTF-16 surrogate half under the Fail policy
    #[error("unmatched surrogate {units:04X?} at offset {offset} in {text:?}")]
    UnmatchedSurrogate {
        text: String,
        offset: usize,
        units: Vec<u16>,
    },

    /// Introspection failure
    #[error("reflection failure: {0}")]
    Reflection(#[from] ReflectionError),

    /// Loop-guard stack discipline violation. Always an implementation
    /// bug, never a user-triggerable condition.
    #[error("loop guard internal fault: {0}")]
    LoopGuardFault(String),

    /// Nesting exceeded the configured maximum depth
    #[error("nesting depth exceeded the configured maximum of {0}")]
    DepthExceeded(usize),

    /// Generic message
    #[error("{0}")]
    Message(String),
}

/// Coarse classification of [`Error`] variants, used as the message
/// catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Lexical,
    Syntax,
    BadPropertyName,
    DuplicateProperty,
    DataStructureLoop,
    UndefinedCodePoint,
    UnmatchedSurrogate,
    Reflection,
    LoopGuardFault,
    DepthExceeded,
    Message,
}

/// Locale for catalog message lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    De,
    Fr,
}

/// Returns the localized one-line summary for an error kind. Falls back
/// to English for kinds without a translation.
pub fn catalog_message(kind: ErrorKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (ErrorKind::Io, Locale::En) => "input/output failure",
        (ErrorKind::Lexical, Locale::En) => "unrecognized token",
        (ErrorKind::Lexical, Locale::De) => "unbekanntes Token",
        (ErrorKind::Lexical, Locale::Fr) => "jeton non reconnu",
        (ErrorKind::Syntax, Locale::En) => "unexpected token",
        (ErrorKind::Syntax, Locale::De) => "unerwartetes Token",
        (ErrorKind::Syntax, Locale::Fr) => "jeton inattendu",
        (ErrorKind::BadPropertyName, Locale::En) => "invalid property name",
        (ErrorKind::DuplicateProperty, Locale::En) => "duplicate property",
        (ErrorKind::DuplicateProperty, Locale::De) => "doppelte Eigenschaft",
        (ErrorKind::DuplicateProperty, Locale::Fr) => "propriete en double",
        (ErrorKind::DataStructureLoop, Locale::En) => "data structure loop",
        (ErrorKind::UndefinedCodePoint, Locale::En) => "undefined code point",
        (ErrorKind::UnmatchedSurrogate, Locale::En) => "unmatched surrogate",
        (ErrorKind::Reflection, Locale::En) => "reflection failure",
        (ErrorKind::LoopGuardFault, Locale::En) => "internal loop guard fault",
        (ErrorKind::DepthExceeded, Locale::En) => "nesting too deep",
        (ErrorKind::Message, Locale::En) => "error",
        (kind, _) => catalog_message(kind, Locale::En),
    }
}

impl Error {
    /// Creates a lexical error from offending text and its stream offset.
    pub fn lexical(text: impl Into<String>, offset: usize) -> Self {
        Error::Lexical {
            text: text.into(),
            offset,
        }
    }

    /// Creates a syntax error carrying expected vs. actual token kinds.
    pub fn syntax(expected: &str, found: &str, offset: usize) -> Self {
        Error::Syntax {
            expected: expected.to_string(),
            found: found.to_string(),
            offset,
        }
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io<T: fmt::Display>(err: T) -> Self {
        Error::Io(err.to_string())
    }

    /// Creates a generic error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use laxjson::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }

    /// Returns the catalog key for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Lexical { .. } => ErrorKind::Lexical,
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::BadPropertyName { .. } => ErrorKind::BadPropertyName,
            Error::DuplicateProperty(_) => ErrorKind::DuplicateProperty,
            Error::DataStructureLoop { .. } => ErrorKind::DataStructureLoop,
            Error::UndefinedCodePoint { .. } => ErrorKind::UndefinedCodePoint,
            Error::UnmatchedSurrogate { .. } => ErrorKind::UnmatchedSurrogate,
            Error::Reflection(_) => ErrorKind::Reflection,
            Error::LoopGuardFault(_) => ErrorKind::LoopGuardFault,
            Error::DepthExceeded(_) => ErrorKind::DepthExceeded,
            Error::Message(_) => ErrorKind::Message,
        }
    }

    /// Returns the localized one-line summary for this error's kind.
    #[must_use]
    pub fn localized_summary(&self, locale: Locale) -> &'static str {
        catalog_message(self.kind(), locale)
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
