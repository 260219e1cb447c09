//! Path Flattening Module
//!
//! Converts provider records keyed by dotted paths (`a.b.c`, `a[0].b`) into
//! nested JSON and back, and offers a typed accessor for reading nested paths.
//!
//! Conflict handling: when one key wants a container where another key put a
//! scalar, the container wins regardless of key order and the scalar is
//! dropped with a warning.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::warn;

/// Array indices above this are treated as garbage rather than padded out
const MAX_ARRAY_INDEX: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Result of reading a nested path. JSON `null` counts as missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> Lookup<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

fn segment_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\.?([^.\[\]]+)|\[(\d+)\]").ok())
        .as_ref()
}

fn parse_segments(path: &str) -> Vec<Segment> {
    let Some(re) = segment_pattern() else {
        return vec![Segment::Key(path.to_string())];
    };

    let mut segments = Vec::new();
    for caps in re.captures_iter(path) {
        if let Some(index) = caps.get(2) {
            match index.as_str().parse::<usize>() {
                Ok(i) => segments.push(Segment::Index(i)),
                Err(_) => segments.push(Segment::Key(index.as_str().to_string())),
            }
        } else if let Some(name) = caps.get(1) {
            segments.push(Segment::Key(name.as_str().to_string()));
        }
    }
    segments
}

/// Rebuild nested structure from a flat dotted-key object.
///
/// Anything that is not an object (arrays included) is returned unchanged, and
/// an object whose keys carry no path syntax comes back as-is, so calling this
/// on already nested data is harmless.
pub fn unflatten(value: &Value) -> Value {
    match value {
        Value::Object(map) => unflatten_map(map),
        other => other.clone(),
    }
}

fn unflatten_map(map: &Map<String, Value>) -> Value {
    let mut root = Value::Null;

    for (key, leaf) in map {
        let mut segments = parse_segments(key);
        if segments.is_empty() {
            // "", "." and the like have no path; keep them as literal fields
            segments.push(Segment::Key(key.clone()));
        }
        insert_at(&mut root, &segments, leaf.clone(), key);
    }

    match root {
        Value::Null => Value::Object(Map::new()),
        nested => nested,
    }
}

fn is_populated_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn insert_at(slot: &mut Value, segments: &[Segment], leaf: Value, key: &str) {
    let Some((head, rest)) = segments.split_first() else {
        if is_populated_container(slot) {
            warn!(key = %key, "unflatten: value collides with nested keys, keeping nested");
            return;
        }
        *slot = leaf;
        return;
    };

    if !slot.is_object() && !slot.is_array() {
        if !slot.is_null() {
            warn!(key = %key, dropped = %slot, "unflatten: scalar replaced by nested keys");
        }
        *slot = match head {
            Segment::Key(_) => Value::Object(Map::new()),
            Segment::Index(_) => Value::Array(Vec::new()),
        };
    }

    let child = match (slot, head) {
        (Value::Object(map), Segment::Key(name)) => map.entry(name.clone()).or_insert(Value::Null),
        (Value::Object(map), Segment::Index(i)) => map.entry(i.to_string()).or_insert(Value::Null),
        (Value::Array(items), segment) => {
            let index = match segment {
                Segment::Index(i) => *i,
                Segment::Key(name) => match name.parse::<usize>() {
                    Ok(i) => i,
                    Err(_) => {
                        warn!(key = %key, field = %name, "unflatten: named field inside an array, skipping");
                        return;
                    }
                },
            };
            if index > MAX_ARRAY_INDEX {
                warn!(key = %key, index, "unflatten: array index too large, skipping");
                return;
            }
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        _ => return,
    };

    insert_at(child, rest, leaf, key);
}

/// Flatten nested JSON into dotted keys. Empty objects and arrays are kept
/// as leaf values; a scalar root yields an empty map.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&mut out, key.clone(), child);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(&mut out, format!("[{}]", i), child);
            }
        }
        _ => {}
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(out, format!("{}.{}", prefix, key), child);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(out, format!("{}[{}]", prefix, i), child);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

/// Read a dotted path out of nested JSON
pub fn lookup<'a>(value: &'a Value, path: &str) -> Lookup<'a> {
    let mut current = value;
    for segment in parse_segments(path) {
        let next = match (current, &segment) {
            (Value::Object(map), Segment::Key(name)) => map.get(name),
            (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
            (Value::Array(items), Segment::Index(i)) => items.get(*i),
            _ => None,
        };
        match next {
            Some(found) => current = found,
            None => return Lookup::Missing,
        }
    }

    if current.is_null() {
        Lookup::Missing
    } else {
        Lookup::Found(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unflatten_empty() {
        assert_eq!(unflatten(&json!({})), json!({}));
    }

    #[test]
    fn test_unflatten_single_flat_key() {
        assert_eq!(unflatten(&json!({"id": 7})), json!({"id": 7}));
    }

    #[test]
    fn test_unflatten_merges_shared_prefixes() {
        let flat = json!({
            "school.name": "Reed College",
            "school.city": "Portland",
            "latest.admissions.sat_scores.25th_percentile.math": 640,
            "latest.admissions.sat_scores.75th_percentile.math": 740,
        });
        let nested = unflatten(&flat);
        assert_eq!(nested["school"], json!({"name": "Reed College", "city": "Portland"}));
        assert_eq!(nested["latest"]["admissions"]["sat_scores"]["25th_percentile"]["math"], json!(640));
        assert_eq!(nested["latest"]["admissions"]["sat_scores"]["75th_percentile"]["math"], json!(740));
    }

    #[test]
    fn test_unflatten_bracket_indices() {
        let flat = json!({"programs[0].code": "CS", "programs[1].code": "EE"});
        assert_eq!(
            unflatten(&flat),
            json!({"programs": [{"code": "CS"}, {"code": "EE"}]})
        );
    }

    #[test]
    fn test_unflatten_passthrough_for_non_objects() {
        assert_eq!(unflatten(&json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(unflatten(&json!("text")), json!("text"));
        assert_eq!(unflatten(&Value::Null), Value::Null);
    }

    #[test]
    fn test_unflatten_is_noop_on_nested_input() {
        let nested = json!({"school": {"name": "Rice University"}, "id": 227757});
        let once = unflatten(&nested);
        assert_eq!(once, nested);
        assert_eq!(unflatten(&once), once);
    }

    #[test]
    fn test_unflatten_keeps_pathless_keys_literal() {
        let flat = json!({"": 1, ".": 2, "[]": 3, "a": 4});
        assert_eq!(unflatten(&flat), flat);
        assert_eq!(lookup(&unflatten(&flat), "a"), Lookup::Found(&json!(4)));
    }

    #[test]
    fn test_unflatten_container_wins_over_scalar() {
        // "a" sorts before "a.b" so the scalar arrives first
        let flat = json!({"a": 1, "a.b": 2});
        assert_eq!(unflatten(&flat), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_flatten_then_unflatten_round_trip() {
        let nested = json!({
            "id": 110635,
            "school": {"name": "UC Berkeley", "state": "CA"},
            "latest": {"admissions": {"admission_rate": {"overall": 0.1138}}},
        });
        let flat = Value::Object(flatten(&nested));
        assert_eq!(flat["school.name"], json!("UC Berkeley"));
        assert_eq!(unflatten(&flat), nested);
    }

    #[test]
    fn test_lookup_found_and_missing() {
        let nested = json!({"school": {"name": "Pomona College", "city": null}, "tags": ["a", "b"]});
        assert_eq!(lookup(&nested, "school.name"), Lookup::Found(&json!("Pomona College")));
        assert_eq!(lookup(&nested, "school.city"), Lookup::Missing);
        assert_eq!(lookup(&nested, "school.zip"), Lookup::Missing);
        assert_eq!(lookup(&nested, "tags[1]").value(), Some(&json!("b")));
        assert!(!lookup(&nested, "tags[5]").is_found());
    }
}
