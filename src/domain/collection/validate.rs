use crate::domain::adoption::RequestStatus;
use crate::domain::collection::{json_type_name, CollectionSchema, FieldError, FieldKind};
use serde_json::{Map, Value as JsonValue};

/// Coerces one value to a declared field kind. Nulls are always accepted.
pub fn coerce_field(kind: FieldKind, v: &JsonValue) -> Result<JsonValue, String> {
    if v.is_null() {
        return Ok(JsonValue::Null);
    }
    match kind {
        FieldKind::Text => match v {
            JsonValue::String(_) => Ok(v.clone()),
            // allow numbers/bools to stringify for text fields
            JsonValue::Number(_) | JsonValue::Bool(_) => Ok(JsonValue::from(v.to_string())),
            _ => Err("expected text".to_string()),
        },
        FieldKind::Number => {
            if v.is_number() {
                return Ok(v.clone());
            }
            if let Some(s) = v.as_str() {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(JsonValue::from(i));
                }
                if let Ok(f) = s.parse::<f64>() {
                    if let Some(n) = serde_json::Number::from_f64(f) {
                        return Ok(JsonValue::Number(n));
                    }
                }
            }
            Err("expected number".to_string())
        }
        FieldKind::Bool => {
            if let Some(b) = v.as_bool() {
                return Ok(JsonValue::from(b));
            }
            if let Some(s) = v.as_str() {
                let lc = s.trim().to_lowercase();
                return match lc.as_str() {
                    "true" | "t" | "1" => Ok(JsonValue::from(true)),
                    "false" | "f" | "0" => Ok(JsonValue::from(false)),
                    _ => Err("expected bool".to_string()),
                };
            }
            Err("expected bool".to_string())
        }
        FieldKind::Json => Ok(v.clone()),
        FieldKind::RequestStatus => {
            let s = v.as_str().ok_or_else(|| "expected request status".to_string())?;
            let status: RequestStatus = s.parse()?;
            Ok(JsonValue::from(status.as_str()))
        }
    }
}

/// Checks and coerces every declared field present in `item`, in place.
///
/// All failures are collected so the caller can report them together.
pub fn validate_item(
    schema: &CollectionSchema,
    item: &mut Map<String, JsonValue>,
) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    for spec in &schema.fields {
        let Some(value) = item.get_mut(spec.name) else {
            continue;
        };
        match coerce_field(spec.kind, value) {
            Ok(coerced) => *value = coerced,
            Err(_) => errors.push(FieldError {
                field: spec.name.to_string(),
                expected: spec.kind.label().to_string(),
                got: json_type_name(value).to_string(),
                value: value.clone(),
            }),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
