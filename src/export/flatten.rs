//! One-level document flattening
//!
//! Turns a raw nested document into a flat record whose keys line up with
//! the dotted-style columns of the output schema. Pure transformation: no
//! I/O, no failure path, and no field is ever dropped here. Filtering
//! against the schema happens later, at write time.

use serde_json::Value;

use super::scroll::RawDocument;

/// A flat record: top-level field names, or `field{sep}sub_field` keys
/// promoted from one level of nesting.
pub type FlatRecord = serde_json::Map<String, Value>;

/// Options controlling the flattening step.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Fields copied through as a single structured value, even when they
    /// would otherwise be expanded (e.g. an array of sub-signals).
    preserve_fields: Vec<String>,
    /// Separator joining field name and sub-key.
    separator: String,
}

impl FlattenOptions {
    /// Create flatten options.
    pub fn new(preserve_fields: Vec<String>, separator: impl Into<String>) -> Self {
        Self {
            preserve_fields,
            separator: separator.into(),
        }
    }

    fn is_preserved(&self, key: &str) -> bool {
        self.preserve_fields.iter().any(|f| f == key)
    }
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self::new(Vec::new(), ".")
    }
}

/// Flatten one raw document into a flat record.
///
/// For each top-level field:
/// - preserve-as-is fields are copied unchanged under their own key;
/// - nested mappings expand to one entry per sub-key, named
///   `"{key}{separator}{sub_key}"` (one level only, deeper structure in a
///   sub-value passes through untouched);
/// - everything else is copied unchanged.
///
/// Total: every raw field maps to one or more flat keys.
pub fn flatten(doc: &RawDocument, options: &FlattenOptions) -> FlatRecord {
    let mut record = FlatRecord::new();

    for (key, value) in doc {
        if options.is_preserved(key) {
            record.insert(key.clone(), value.clone());
        } else if let Value::Object(nested) = value {
            for (sub_key, sub_value) in nested {
                record.insert(
                    format!("{key}{}{sub_key}", options.separator),
                    sub_value.clone(),
                );
            }
        } else {
            record.insert(key.clone(), value.clone());
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RawDocument {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_scalars_copied_unchanged() {
        let raw = doc(json!({ "a": 1, "b": "two", "c": true, "d": null }));
        let flat = flatten(&raw, &FlattenOptions::default());
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["a"], json!(1));
        assert_eq!(flat["b"], json!("two"));
        assert_eq!(flat["d"], json!(null));
    }

    #[test]
    fn test_nested_mapping_expands_one_level() {
        let raw = doc(json!({ "user": { "name": "ada", "age": 36 }, "id": 7 }));
        let flat = flatten(&raw, &FlattenOptions::default());
        assert_eq!(flat["user.name"], json!("ada"));
        assert_eq!(flat["user.age"], json!(36));
        assert_eq!(flat["id"], json!(7));
        assert!(!flat.contains_key("user"));
    }

    #[test]
    fn test_deeper_nesting_passes_through() {
        let raw = doc(json!({ "c": { "x": { "y": 9 } } }));
        let flat = flatten(&raw, &FlattenOptions::default());
        // Only one level: the sub-value keeps its structure
        assert_eq!(flat["c.x"], json!({ "y": 9 }));
    }

    #[test]
    fn test_preserve_field_stays_structured() {
        let options = FlattenOptions::new(vec!["signals".to_string()], ".");
        let raw = doc(json!({
            "signals": [ { "kind": "sms" }, { "kind": "push" } ],
            "meta": { "ts": 1 }
        }));
        let flat = flatten(&raw, &options);
        assert_eq!(flat["signals"], json!([{ "kind": "sms" }, { "kind": "push" }]));
        assert_eq!(flat["meta.ts"], json!(1));
    }

    #[test]
    fn test_arrays_copied_unchanged_by_default() {
        let raw = doc(json!({ "tags": ["a", "b"] }));
        let flat = flatten(&raw, &FlattenOptions::default());
        assert_eq!(flat["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_custom_separator() {
        let options = FlattenOptions::new(Vec::new(), "__");
        let raw = doc(json!({ "geo": { "lat": 1.5 } }));
        let flat = flatten(&raw, &options);
        assert_eq!(flat["geo__lat"], json!(1.5));
    }

    #[test]
    fn test_no_field_dropped() {
        let raw = doc(json!({
            "a": 1,
            "b": { "x": 2, "y": 3 },
            "c": [4, 5]
        }));
        let flat = flatten(&raw, &FlattenOptions::default());
        // a, b.x, b.y, c
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_idempotent_on_already_flat_keys() {
        let options = FlattenOptions::new(vec!["signals".to_string()], ".");
        let raw = doc(json!({
            "a": 1,
            "user": { "name": "ada" },
            "signals": [ { "kind": "sms" } ]
        }));
        let flat = flatten(&raw, &options);

        // Restrict to keys whose values are no longer nested mappings and
        // re-apply: the result must be unchanged.
        let restricted: RawDocument = flat
            .iter()
            .filter(|(_, v)| !v.is_object())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let again = flatten(&restricted, &options);
        assert_eq!(again, restricted);
    }
}
