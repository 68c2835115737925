//! Configuration for JSON serialization and parsing.
//!
//! This module provides the types that make up the codec's configuration
//! surface:
//!
//! - [`JsonConfig`]: the main configuration struct, cloned once per
//!   top-level call
//! - [`EcmaMode`]: identifier and escape strictness (ECMAScript 5 legacy
//!   rules vs. ECMAScript 6 code-point escapes)
//! - [`QuoteChar`]: the active string quote character
//! - [`CodePointPolicy`]: what to do with undefined code points and
//!   unmatched surrogate halves
//! - [`DuplicateKeys`]: parse-time duplicate property policy
//! - [`Visibility`]: threshold for implicit structural reflection
//!
//! ## Examples
//!
//! ```rust
//! use laxjson::{JsonConfig, EcmaMode, DuplicateKeys};
//!
//! let config = JsonConfig::new()
//!     .with_ecma_mode(EcmaMode::Ecma6)
//!     .with_duplicate_keys(DuplicateKeys::Fail)
//!     .with_preserve_int_precision(true);
//! ```

/// Identifier and escape strictness.
///
/// Legacy mode ([`EcmaMode::Ecma5`]) restricts identifiers to the Basic
/// Multilingual Plane and always emits 4-hex-digit `\uXXXX` escapes,
/// using surrogate pairs for astral code points. [`EcmaMode::Ecma6`]
/// admits astral identifier characters directly and may emit the shorter
/// `\u{X...}` code-point escape form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EcmaMode {
    #[default]
    Ecma5,
    Ecma6,
}

/// The quote character used for emitted strings. Input accepts either
/// quote regardless of this setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuoteChar {
    #[default]
    Double,
    Single,
}

impl QuoteChar {
    /// Returns the character for this quote choice.
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            QuoteChar::Double => '"',
            QuoteChar::Single => '\'',
        }
    }
}

/// Policy for undefined code points and unmatched surrogate halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CodePointPolicy {
    /// Copy the offending unit through unchanged (escape spellings the
    /// host string type cannot represent stay spelled as escapes).
    #[default]
    PassThrough,
    /// Substitute U+FFFD REPLACEMENT CHARACTER.
    Replace,
    /// Abort with an error.
    Fail,
}

/// Parse-time policy for objects carrying the same key twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    /// The later entry replaces the earlier one in place.
    #[default]
    LastWins,
    /// Raise [`crate::Error::DuplicateProperty`].
    Fail,
}

/// Visibility threshold for implicit reflection. Ordered: a configured
/// threshold admits fields at or above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Visibility {
    Private,
    Crate,
    #[default]
    Public,
}

impl Visibility {
    /// Parses a visibility name, for configuration loaded from text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReflectionError::InvalidVisibility`] for any
    /// unknown name.
    pub fn parse(name: &str) -> std::result::Result<Self, crate::ReflectionError> {
        match name {
            "private" => Ok(Visibility::Private),
            "crate" => Ok(Visibility::Crate),
            "public" => Ok(Visibility::Public),
            other => Err(crate::ReflectionError::InvalidVisibility(other.to_string())),
        }
    }
}

/// Configuration for the codec.
///
/// A config is an immutable-per-call snapshot: entry points clone it once
/// and thread a reference through the whole recursive call tree, so one
/// logical top-level call observes one consistent configuration.
///
/// # Examples
///
/// ```rust
/// use laxjson::JsonConfig;
///
/// let config = JsonConfig::new().with_max_depth(32);
/// assert_eq!(config.max_depth, 32);
/// ```
#[derive(Clone, Debug)]
pub struct JsonConfig {
    /// Identifier/escape strictness.
    pub ecma_mode: EcmaMode,
    /// Quote character for emitted strings.
    pub quote: QuoteChar,
    /// Parse integers beyond `i64` range into `BigInt` so their digits
    /// survive a round trip. Off, they collapse to `f64`.
    pub preserve_int_precision: bool,
    /// Parse decimals `f64` would round into `BigDecimal` so their
    /// digits survive a round trip. Off, they collapse to `f64`.
    pub preserve_decimal_precision: bool,
    /// Policy for unassigned code points in strings.
    pub undefined_code_point: CodePointPolicy,
    /// Policy for lone surrogate halves in `\u` escape sequences.
    pub unmatched_surrogate: CodePointPolicy,
    /// Duplicate-key policy when parsing objects.
    pub duplicate_keys: DuplicateKeys,
    /// Validate emitted property names as ECMAScript identifiers.
    pub validate_property_names: bool,
    /// Detect cycles in serialized value graphs.
    pub detect_loops: bool,
    /// Visibility threshold for implicit reflection.
    pub visibility: Visibility,
    /// Maximum nesting depth for both parsing and serialization.
    pub max_depth: usize,
}

impl Default for JsonConfig {
    fn default() -> Self {
        JsonConfig {
            ecma_mode: EcmaMode::default(),
            quote: QuoteChar::default(),
            preserve_int_precision: true,
            preserve_decimal_precision: true,
            undefined_code_point: CodePointPolicy::default(),
            unmatched_surrogate: CodePointPolicy::default(),
            duplicate_keys: DuplicateKeys::default(),
            validate_property_names: false,
            detect_loops: true,
            visibility: Visibility::default(),
            max_depth: 128,
        }
    }
}

impl JsonConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier/escape strictness mode.
    #[must_use]
    pub fn with_ecma_mode(mut self, mode: EcmaMode) -> Self {
        self.ecma_mode = mode;
        self
    }

    /// Sets the quote character for emitted strings.
    #[must_use]
    pub fn with_quote(mut self, quote: QuoteChar) -> Self {
        self.quote = quote;
        self
    }

    /// Enables or disables integer precision preservation.
    #[must_use]
    pub fn with_preserve_int_precision(mut self, on: bool) -> Self {
        self.preserve_int_precision = on;
        self
    }

    /// Enables or disables decimal precision preservation.
    #[must_use]
    pub fn with_preserve_decimal_precision(mut self, on: bool) -> Self {
        self.preserve_decimal_precision = on;
        self
    }

    /// Sets the undefined-code-point policy.
    #[must_use]
    pub fn with_undefined_code_point(mut self, policy: CodePointPolicy) -> Self {
        self.undefined_code_point = policy;
        self
    }

    /// Sets the unmatched-surrogate policy.
    #[must_use]
    pub fn with_unmatched_surrogate(mut self, policy: CodePointPolicy) -> Self {
        self.unmatched_surrogate = policy;
        self
    }

    /// Sets the duplicate-key policy for parsing.
    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Enables or disables property-name identifier validation.
    #[must_use]
    pub fn with_validate_property_names(mut self, on: bool) -> Self {
        self.validate_property_names = on;
        self
    }

    /// Enables or disables data-structure loop detection.
    #[must_use]
    pub fn with_detect_loops(mut self, on: bool) -> Self {
        self.detect_loops = on;
        self
    }

    /// Sets the visibility threshold for implicit reflection.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the maximum nesting depth for parsing and serialization.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
