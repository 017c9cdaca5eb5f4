//! Versioned-merge engine.
//!
//! Combines a base bundle (caller-supplied seed or previous state), a
//! generated bundle (pipeline output), and a locked-field set into the
//! final bundle that gets fingerprinted and persisted.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::bundle::MetadataBundle;
use crate::error::Result;

/// Merge `generated` over `base` honoring `locked_fields`.
///
/// Per field:
/// - locked and non-null in `base` → base wins;
/// - else non-null in `generated` → generated wins;
/// - else → base (possibly null).
///
/// A final pass forces every locked field back to the base value, so the
/// lock holds as an invariant independent of the per-field ordering above.
pub fn merge(
    base: Option<&MetadataBundle>,
    generated: Option<&MetadataBundle>,
    locked_fields: &[String],
) -> Result<MetadataBundle> {
    let base_map = to_map(base)?;
    let generated_map = to_map(generated)?;
    let locked: HashSet<&str> = locked_fields.iter().map(String::as_str).collect();

    let mut merged = base_map.clone();
    for (key, value) in generated_map {
        if locked.contains(key.as_str())
            && base_map.get(&key).map(|v| !v.is_null()).unwrap_or(false)
        {
            continue;
        }
        if !value.is_null() {
            merged.insert(key, value);
        } else {
            merged.entry(key).or_insert(Value::Null);
        }
    }

    // Re-assertion pass: locked fields always end up as the base value.
    for key in &locked {
        if let Some(value) = base_map.get(*key) {
            merged.insert((*key).to_string(), value.clone());
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn to_map(bundle: Option<&MetadataBundle>) -> Result<Map<String, Value>> {
    let bundle = bundle.cloned().unwrap_or_default();
    match serde_json::to_value(&bundle)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
