//! # laxjson
//!
//! A bidirectional codec for a lenient superset of JSON, with a
//! structural-reflection layer for emitting arbitrary Rust types.
//!
//! ## What does "lenient" mean?
//!
//! The parser accepts everything strict JSON accepts, plus the relaxed
//! forms that show up in hand-written configuration and
//! JavaScript-adjacent data:
//!
//! - **Either quote style**: `"double"` and `'single'` quoted strings
//! - **Bare identifier keys**: `{count: 3}` instead of `{"count": 3}`
//! - **Trailing commas**: `[1, 2, 3,]` and `{a: 1,}`
//! - **Date literals**: `new Date(1234567890)` parses to a timestamp
//! - **`undefined`**: accepted and mapped to null
//!
//! ## Key Features
//!
//! - **Precision preservation**: integers beyond `i64` become big
//!   integers, decimals that `f64` would round become big decimals
//! - **Serde Compatible**: works with existing Rust types via
//!   `#[derive(Serialize, Deserialize)]`
//! - **Loop detection**: serialization of shared-ownership graphs
//!   reports reference cycles instead of recursing forever
//! - **Structural reflection**: registered types can be emitted
//!   field-by-field under visibility thresholds, explicit field lists,
//!   and aliases, with resolved plans cached process-wide
//! - **Configurable output**: quote style, ECMAScript 5 or 6 escape
//!   syntax, code-point policies, nesting limits
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! laxjson = "0.1"
//! serde = { version = "1.0", features = ["derive"] }
//! ```
//!
//! ### Basic Serialization and Deserialization
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use laxjson::{to_string, from_str};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! // Lenient input: bare keys, single quotes, trailing comma.
//! let user: User = from_str("{id: 123, name: 'Alice', active: true,}").unwrap();
//!
//! // Output is strict JSON by default.
//! let text = to_string(&user).unwrap();
//! assert_eq!(text, r#"{"id":123,"name":"Alice","active":true}"#);
//! ```
//!
//! ### Dynamic Values with the json! Macro
//!
//! ```rust
//! use laxjson::{json, Value};
//!
//! let data = json!({
//!     "name": "Alice",
//!     "age": 30,
//!     "tags": ["rust", "serde"]
//! });
//!
//! if let Value::Object(obj) = data {
//!     assert_eq!(obj.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! }
//! ```
//!
//! ### Reflection
//!
//! ```rust
//! use laxjson::{reflect_fields, reflect, write_value, JsonConfig};
//!
//! struct Sensor {
//!     id: u32,
//!     reading: f64,
//!     calibration: f64,
//! }
//!
//! reflect_fields! {
//!     Sensor {
//!         id: Public,
//!         reading: Public,
//!         calibration: Private,
//!     }
//! }
//!
//! let sensor = Sensor { id: 1, reading: 20.5, calibration: 0.02 };
//! let value = reflect(&sensor, &JsonConfig::default()).unwrap();
//! assert_eq!(write_value(&value).unwrap(), r#"{"id":1,"reading":20.5}"#);
//! ```
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Proper error propagation with `Result` types
//! - No panics in the public API (except for logic errors that indicate bugs)

pub mod de;
pub mod error;
pub mod escape;
pub mod grammar;
pub mod macros;
pub mod map;
pub mod options;
pub mod pairs;
pub mod reflect;
pub mod ser;
pub mod token;
pub mod value;

pub use de::{
    from_reader, from_slice, from_str, from_value, parse_reader, parse_reader_with_config,
    parse_str, parse_str_with_config, Parser,
};
pub use error::{Error, ErrorKind, Locale, LoopFrame, ReflectionError, Result};
pub use escape::{
    escape_property_name, escape_string, is_identifier_part, is_identifier_start, unescape,
};
pub use map::JsonMap;
pub use options::{CodePointPolicy, DuplicateKeys, EcmaMode, JsonConfig, QuoteChar, Visibility};
pub use pairs::{FixedPairs, GrowablePairs, PairList};
pub use reflect::{
    clear_plan_cache, plan_for, reflect, reflect_with, FieldDescriptor, FieldPlan, FieldSelection,
    PlannedField, Reflect, TypeDescriptor,
};
pub use ser::{
    to_string, to_string_with_config, to_value, to_writer, write_pairs, write_value,
    write_value_into, write_value_to, write_value_with_config, IoSink, LoopGuard, Shape, Sink,
    ToJson,
    ValueSerializer, WriteContext,
};
pub use token::{Literal, Token, Tokenizer};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: 2 };
        let text = to_string(&point).unwrap();
        let point_back: Point = from_str(&text).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_user() {
        let user = User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "user".to_string()],
        };

        let text = to_string(&user).unwrap();
        let user_back: User = from_str(&text).unwrap();
        assert_eq!(user, user_back);
    }

    #[test]
    fn test_lenient_input_strict_output() {
        let user: User = from_str(
            "{id: 1, name: 'Bo', active: false, tags: ['a',],}",
        )
        .unwrap();
        assert_eq!(
            to_string(&user).unwrap(),
            r#"{"id":1,"name":"Bo","active":false,"tags":["a"]}"#
        );
    }

    #[test]
    fn test_to_value() {
        let point = Point { x: 1, y: 2 };
        let value = to_value(&point).unwrap();

        match value {
            Value::Object(obj) => {
                assert_eq!(obj.get("x"), Some(&Value::Int(1)));
                assert_eq!(obj.get("y"), Some(&Value::Int(2)));
            }
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_arrays() {
        let numbers = vec![1, 2, 3, 4, 5];
        let text = to_string(&numbers).unwrap();
        let numbers_back: Vec<i32> = from_str(&text).unwrap();
        assert_eq!(numbers, numbers_back);
    }

    #[test]
    fn test_from_reader_and_slice() {
        let point: Point = from_reader(std::io::Cursor::new(b"{x: 1, y: 2}".to_vec())).unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });
        let point: Point = from_slice(b"{x: 3, y: 4}").unwrap();
        assert_eq!(point, Point { x: 3, y: 4 });
    }

    #[test]
    fn test_custom_config() {
        let user = User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string()],
        };

        let config = JsonConfig::default()
            .with_quote(QuoteChar::Single)
            .with_ecma_mode(EcmaMode::Ecma6);

        let text = to_string_with_config(&user, &config).unwrap();
        assert!(text.contains("'Alice'"));
        let user_back: User = from_str(&text).unwrap();
        assert_eq!(user, user_back);
    }
}
