//! Property-based tests for path addressing.

use lcp_core::{LcpError, pointer};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Keys that never parse as integers, so they stay object keys.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}"
}

/// A nested value together with the path to one existing string leaf.
fn nested_strategy() -> impl Strategy<Value = (Value, String)> {
    let leaf = "[a-zA-Z ]{0,8}".prop_map(|s| (json!(s), String::new()));
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (key_strategy(), inner.clone(), key_strategy(), any::<u8>()).prop_map(
                |(k, (child, path), other, n)| {
                    let mut map = Map::new();
                    map.insert(other, json!(n));
                    map.insert(k.clone(), child);
                    (Value::Object(map), format!("/{}{}", k, path))
                }
            ),
            (inner, 0usize..3).prop_map(|((child, path), pad)| {
                let mut items: Vec<Value> = (0..pad).map(|i| json!(i)).collect();
                items.push(child);
                (Value::Array(items), format!("/{}{}", pad, path))
            }),
        ]
    })
    .prop_filter("path must address a nested node", |(_, path)| !path.is_empty())
}

proptest! {
    /// Setting then getting the same existing node returns what was set.
    #[test]
    fn set_then_get_round_trips((data, path) in nested_strategy(), new in "[a-z]{0,10}") {
        let mut data = data;
        pointer::set(&mut data, &path, json!(new.clone())).unwrap();
        prop_assert_eq!(pointer::get(&data, &path).unwrap(), &json!(new));
    }

    /// Any missing segment fails, whatever its depth.
    #[test]
    fn missing_segment_fails_at_every_depth(
        (data, path) in nested_strategy(),
        cut in 0usize..8,
    ) {
        let segments: Vec<&str> = path[1..].split('/').collect();
        let depth = cut % segments.len();
        let mut broken: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        broken[depth] = "zz_missing".to_string();
        let broken_path = format!("/{}", broken.join("/"));
        match pointer::get(&data, &broken_path) {
            Err(LcpError::PathResolution { segment, depth: d, .. }) => {
                prop_assert_eq!(segment, "zz_missing");
                prop_assert_eq!(d, depth + 1);
            }
            other => prop_assert!(false, "expected PathResolution, got {:?}", other),
        }
    }
}
