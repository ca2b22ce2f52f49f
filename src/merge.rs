//! allOf merging - collapses `allOf` compositions into single schemas.
//!
//! [`merge_all_of`] deeply resolves every `allOf` in a schema fragment:
//! nested compositions are collapsed bottom-up, then each composition's
//! members are folded left-to-right into the member's siblings. Keywords
//! with a dedicated combination rule (`type`, `properties`, `required`,
//! `enum`, numeric bounds) combine structurally; any other keyword takes
//! the first defined value.

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::types::{json_type_name, MergeOptions};

/// Keywords whose values are maps of sub-schemas.
const MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "$defs", "definitions"];

/// Keywords whose values are single sub-schemas (when the value is an object).
const SINGLE_KEYWORDS: &[&str] = &[
    "items",
    "additionalProperties",
    "additionalItems",
    "contains",
    "propertyNames",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose values are arrays of sub-schemas.
const ARRAY_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Resolve every `allOf` composition in a schema fragment.
///
/// Returns an equivalent fragment with no `allOf` keys. A fragment without
/// `allOf` anywhere is returned unchanged, so merging is idempotent.
///
/// # Errors
///
/// Returns `MergeError` when sibling keyword values cannot be reconciled
/// (e.g. incompatible `type` declarations) or a member still carries `$ref`.
pub fn merge_all_of(schema: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    merge_value(schema, options)
}

fn merge_value(value: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };

    // Resolve nested compositions in sub-schemas first, so each allOf
    // member arriving at collapse() is itself already flat.
    let mut out = Map::new();
    for (key, child) in map {
        let resolved = if MAP_KEYWORDS.contains(&key.as_str()) {
            merge_schema_map(child, options)?
        } else if ARRAY_KEYWORDS.contains(&key.as_str()) {
            merge_schema_array(child, options)?
        } else if SINGLE_KEYWORDS.contains(&key.as_str()) && child.is_object() {
            merge_value(child, options)?
        } else {
            child.clone()
        };
        out.insert(key.clone(), resolved);
    }

    match out.remove("allOf") {
        Some(members) => collapse(out, members, options),
        None => Ok(Value::Object(out)),
    }
}

fn merge_schema_map(value: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    let Some(entries) = value.as_object() else {
        return Ok(value.clone());
    };
    let mut out = Map::new();
    for (name, schema) in entries {
        out.insert(name.clone(), merge_value(schema, options)?);
    }
    Ok(Value::Object(out))
}

fn merge_schema_array(value: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    let Some(items) = value.as_array() else {
        return Ok(value.clone());
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(merge_value(item, options)?);
    }
    Ok(Value::Array(out))
}

/// Fold an `allOf`'s members into the sibling keywords of its holder.
fn collapse(
    siblings: Map<String, Value>,
    members: Value,
    options: &MergeOptions,
) -> Result<Value, MergeError> {
    let Value::Array(members) = members else {
        return Err(MergeError::InvalidComposition {
            actual: json_type_name(&members).to_string(),
        });
    };

    check_no_ref(&siblings)?;
    let mut acc = siblings;

    for member in members {
        let member = match member {
            // `true` constrains nothing
            Value::Bool(true) => continue,
            Value::Object(obj) => obj,
            other => {
                return Err(MergeError::InvalidComposition {
                    actual: json_type_name(&other).to_string(),
                })
            }
        };
        check_no_ref(&member)?;
        merge_into(&mut acc, member, options)?;
    }

    Ok(Value::Object(acc))
}

fn check_no_ref(map: &Map<String, Value>) -> Result<(), MergeError> {
    if let Some(reference) = map.get("$ref").and_then(|v| v.as_str()) {
        return Err(MergeError::UnresolvedRef {
            reference: reference.to_string(),
        });
    }
    Ok(())
}

/// Merge one member's keywords into the accumulator.
fn merge_into(
    acc: &mut Map<String, Value>,
    member: Map<String, Value>,
    options: &MergeOptions,
) -> Result<(), MergeError> {
    for (key, value) in member {
        if key == "additionalProperties" && options.ignore_additional_properties {
            // First value wins; never blocks combining properties
            acc.entry(key).or_insert(value);
            continue;
        }

        let Some(existing) = acc.get(&key) else {
            acc.insert(key, value);
            continue;
        };

        if *existing == value {
            continue;
        }

        let combined = match key.as_str() {
            "type" => combine_type(existing, &value)?,
            "properties" | "patternProperties" => {
                combine_schema_maps(existing, &value, options)?
            }
            "required" => combine_required(existing, &value),
            "enum" => combine_enum(existing, &value)?,
            "minimum" | "exclusiveMinimum" | "minLength" | "minItems" | "minProperties" => {
                combine_numeric(existing, &value, true)
            }
            "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" | "maxProperties" => {
                combine_numeric(existing, &value, false)
            }
            "uniqueItems" => Value::Bool(
                existing.as_bool().unwrap_or(false) || value.as_bool().unwrap_or(false),
            ),
            "items" | "additionalProperties" | "contains" | "propertyNames" => {
                if existing.is_object() && value.is_object() {
                    merge_two(existing, &value, options)?
                } else if existing.is_boolean() && value.is_boolean() {
                    Value::Bool(
                        existing.as_bool().unwrap_or(true) && value.as_bool().unwrap_or(true),
                    )
                } else {
                    return Err(conflict(&key, existing, &value));
                }
            }
            // Everything else follows the first-value-wins default resolver.
            _ => continue,
        };
        acc.insert(key, combined);
    }
    Ok(())
}

/// Merge two schema objects as if composed via `allOf`.
fn merge_two(a: &Value, b: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    let (Value::Object(a_map), Value::Object(b_map)) = (a, b) else {
        return Err(conflict("schema", a, b));
    };
    check_no_ref(a_map)?;
    check_no_ref(b_map)?;
    let mut acc = a_map.clone();
    merge_into(&mut acc, b_map.clone(), options)?;
    Ok(Value::Object(acc))
}

fn combine_type(a: &Value, b: &Value) -> Result<Value, MergeError> {
    match (a, b) {
        (Value::String(_), Value::String(_)) => Err(conflict("type", a, b)),
        (Value::Array(types), Value::String(t)) | (Value::String(t), Value::Array(types)) => {
            if types.iter().any(|v| v.as_str() == Some(t)) {
                Ok(Value::String(t.clone()))
            } else {
                Err(conflict("type", a, b))
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            let common: Vec<Value> = left
                .iter()
                .filter(|t| right.contains(t))
                .cloned()
                .collect();
            match common.len() {
                0 => Err(conflict("type", a, b)),
                1 => Ok(common.into_iter().next().unwrap_or(Value::Null)),
                _ => Ok(Value::Array(common)),
            }
        }
        _ => Err(conflict("type", a, b)),
    }
}

fn combine_schema_maps(a: &Value, b: &Value, options: &MergeOptions) -> Result<Value, MergeError> {
    let (Some(a_map), Some(b_map)) = (a.as_object(), b.as_object()) else {
        return Err(conflict("properties", a, b));
    };

    let mut out = a_map.clone();
    for (name, b_schema) in b_map {
        match a_map.get(name) {
            Some(a_schema) if a_schema != b_schema => {
                out.insert(name.clone(), merge_two(a_schema, b_schema, options)?);
            }
            Some(_) => {}
            None => {
                out.insert(name.clone(), b_schema.clone());
            }
        }
    }
    Ok(Value::Object(out))
}

fn combine_required(a: &Value, b: &Value) -> Value {
    let mut out: Vec<Value> = a.as_array().cloned().unwrap_or_default();
    for item in b.as_array().into_iter().flatten() {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Value::Array(out)
}

fn combine_enum(a: &Value, b: &Value) -> Result<Value, MergeError> {
    let (Some(left), Some(right)) = (a.as_array(), b.as_array()) else {
        return Err(conflict("enum", a, b));
    };
    let common: Vec<Value> = left.iter().filter(|v| right.contains(v)).cloned().collect();
    if common.is_empty() {
        return Err(MergeError::EmptyEnum);
    }
    Ok(Value::Array(common))
}

/// Keep the tighter bound: the larger of two minimums, the smaller of two maximums.
fn combine_numeric(a: &Value, b: &Value, take_max: bool) -> Value {
    let (Some(left), Some(right)) = (a.as_f64(), b.as_f64()) else {
        return a.clone();
    };
    if (take_max && right > left) || (!take_max && right < left) {
        b.clone()
    } else {
        a.clone()
    }
}

fn conflict(keyword: &str, left: &Value, right: &Value) -> MergeError {
    MergeError::Conflict {
        keyword: keyword.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    }
}
