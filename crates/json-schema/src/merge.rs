//! Structural deep merge of JSON documents.
//!
//! Used to overlay a `oneOf` constraint onto its base schema. Precedence, per
//! key of the overlay:
//!
//! * object onto anything: merged recursively (a non-object base value is
//!   replaced by an empty object first);
//! * array onto array: the overlay's items are appended to the base's;
//! * anything else: the overlay's value replaces the base's.
//!
//! Keys keep their position in the base; keys new to the base are appended.

use serde_json::{Map, Value};

/// Returns `base` with `overlay` merged onto it. Neither input is modified.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}

/// Merges `overlay` onto `destination` in place.
pub fn merge_into(destination: &mut Value, overlay: &Value) {
    let Value::Object(source) = overlay else {
        *destination = overlay.clone();
        return;
    };
    if !destination.is_object() {
        *destination = Value::Object(Map::new());
    }
    if let Value::Object(target) = destination {
        merge_maps(target, source);
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(_) => {
                let node = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                merge_into(node, value);
            }
            Value::Array(items) => match target.get_mut(key) {
                Some(Value::Array(existing)) => existing.extend(items.iter().cloned()),
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            },
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
