//! Property-based tests - pragmatic approach testing core roundtrip guarantees
//!
//! These complement the integration tests by verifying properties across
//! a wide range of generated inputs.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use laxjson::{from_str, parse_str, to_string, write_value, Value};

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    match to_string(value) {
        Ok(serialized) => match from_str::<T>(&serialized) {
            Ok(deserialized) => *value == deserialized,
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Serialized was: {}", serialized);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

proptest! {
    // Test primitive types
    #[test]
    fn prop_i32(n in any::<i32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_bool(b in any::<bool>()) {
        prop_assert!(roundtrip(&b));
    }

    #[test]
    fn prop_finite_f64(n in -1.0e15f64..1.0e15f64) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_string(s in "\\PC*") {
        prop_assert!(roundtrip(&s));
    }

    // Test collections
    #[test]
    fn prop_vec_i32(v in prop::collection::vec(any::<i32>(), 0..20)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_option_i32(opt in proptest::option::of(any::<i32>())) {
        prop_assert!(roundtrip(&opt));
    }

    #[test]
    fn prop_tuple_i32_bool(t in (any::<i32>(), any::<bool>())) {
        prop_assert!(roundtrip(&t));
    }

    // Written text always re-parses to the same tree
    #[test]
    fn prop_value_text_stable(keys in prop::collection::vec("[a-z]{1,8}", 0..8),
                              nums in prop::collection::vec(any::<i64>(), 0..8)) {
        let mut map = laxjson::JsonMap::new();
        for (key, num) in keys.iter().zip(nums.iter()) {
            map.insert(key.clone(), Value::Int(*num));
        }
        let value = Value::Object(map);
        let text = write_value(&value).unwrap();
        let reparsed = parse_str(&text).unwrap();
        prop_assert_eq!(&value, &reparsed);
        // And writing again is byte-stable.
        prop_assert_eq!(text, write_value(&reparsed).unwrap());
    }

    // Integer text of any length survives parse-then-write
    #[test]
    fn prop_big_integer_text(digits in "[1-9][0-9]{0,38}") {
        let value = parse_str(&digits).unwrap();
        prop_assert_eq!(write_value(&value).unwrap(), digits);
    }
}
