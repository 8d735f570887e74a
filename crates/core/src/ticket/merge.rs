//! Recursive merge of partial updates into a ticket document.

use serde_json::Value;

/// Merge `overlay` into `target` in place.
///
/// When both sides hold an object the merge recurses per key; in every
/// other case the overlay value replaces the target value. `null` is a
/// value like any other and replaces what was there, which is how stage
/// resets clear old payload fields. Keys absent from the overlay are
/// never touched.
pub fn deep_merge(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(target_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match target_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, overlay_value),
                    None => {
                        target_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (target_slot, overlay_value) => {
            *target_slot = overlay_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_preserves_sibling_keys() {
        let mut doc = json!({
            "status": "extracted",
            "raw": { "title": "Invoice ABC", "priority": "normal" },
            "extraction": { "status": "completed", "processingTimeMs": 412 }
        });

        deep_merge(
            &mut doc,
            json!({
                "status": "ai_processing",
                "aiProcessing": { "status": "pending" }
            }),
        );

        // Untouched siblings survive at every level.
        assert_eq!(doc["raw"]["title"], "Invoice ABC");
        assert_eq!(doc["extraction"]["processingTimeMs"], 412);
        assert_eq!(doc["status"], "ai_processing");
        assert_eq!(doc["aiProcessing"]["status"], "pending");
    }

    #[test]
    fn test_merge_recurses_into_nested_objects() {
        let mut doc = json!({
            "aiProcessing": {
                "status": "pending",
                "standardizedCodes": { "vendorCode": "VND-OLD" }
            }
        });

        deep_merge(
            &mut doc,
            json!({
                "aiProcessing": {
                    "status": "completed",
                    "standardizedCodes": { "departmentCode": "DEPT-PROC" }
                }
            }),
        );

        assert_eq!(doc["aiProcessing"]["status"], "completed");
        assert_eq!(
            doc["aiProcessing"]["standardizedCodes"]["vendorCode"],
            "VND-OLD"
        );
        assert_eq!(
            doc["aiProcessing"]["standardizedCodes"]["departmentCode"],
            "DEPT-PROC"
        );
    }

    #[test]
    fn test_null_overwrites_existing_value() {
        let mut doc = json!({
            "extraction": {
                "status": "error",
                "errorMessage": "no attachment",
                "processingTimeMs": 12
            }
        });

        deep_merge(
            &mut doc,
            json!({
                "extraction": {
                    "status": "pending",
                    "errorMessage": null,
                    "processingTimeMs": null
                }
            }),
        );

        assert_eq!(doc["extraction"]["status"], "pending");
        assert!(doc["extraction"]["errorMessage"].is_null());
        assert!(doc["extraction"]["processingTimeMs"].is_null());
    }

    #[test]
    fn test_arrays_replace_rather_than_append() {
        let mut doc = json!({ "aiProcessing": { "flags": ["PAST_DUE"] } });

        deep_merge(
            &mut doc,
            json!({ "aiProcessing": { "flags": ["AMOUNT_DISCREPANCY", "MANUAL_REVIEW_REQUIRED"] } }),
        );

        assert_eq!(
            doc["aiProcessing"]["flags"],
            json!(["AMOUNT_DISCREPANCY", "MANUAL_REVIEW_REQUIRED"])
        );
    }

    #[test]
    fn test_scalar_replaced_by_object() {
        let mut doc = json!({ "slot": 42 });
        deep_merge(&mut doc, json!({ "slot": { "nested": true } }));
        assert_eq!(doc["slot"]["nested"], true);
    }

    #[test]
    fn test_new_keys_are_inserted() {
        let mut doc = json!({ "a": 1 });
        deep_merge(&mut doc, json!({ "b": { "c": 2 } }));
        assert_eq!(doc["a"], 1);
        assert_eq!(doc["b"]["c"], 2);
    }

    #[test]
    fn test_empty_overlay_is_a_no_op() {
        let mut doc = json!({ "status": "ingested", "raw": { "title": "t" } });
        let before = doc.clone();
        deep_merge(&mut doc, json!({}));
        assert_eq!(doc, before);
    }
}
