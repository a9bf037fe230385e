use crate::app::MutationRequest;
use crate::error::AppError;
use axum::response::IntoResponse;
use serde_json::Value as JsonValue;

const BOM: char = '\u{feff}';

/// Parses a `/mutate` body leniently: a leading BOM and surrounding whitespace are
/// ignored, a body that is itself a JSON string holding the object is decoded twice, and
/// an object wrapped in bare `"..."` or `'...'` quotes is unwrapped and unescaped.
pub fn parse_mutation_body(body: &[u8]) -> Result<MutationRequest, AppError> {
    let text = std::str::from_utf8(body).map_err(|_| AppError::InvalidJson)?;
    let text = text.trim_start_matches(BOM).trim();
    if text.is_empty() {
        return Err(AppError::InvalidJson);
    }

    let mut value: JsonValue = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let inner = strip_outer_quotes(text).ok_or(AppError::InvalidJson)?;
            serde_json::from_str(&inner.replace("\\\"", "\"")).map_err(|_| AppError::InvalidJson)?
        }
    };
    if let JsonValue::String(inner) = &value {
        value = serde_json::from_str(inner.trim_start_matches(BOM).trim())
            .map_err(|_| AppError::InvalidJson)?;
    }
    if !value.is_object() {
        return Err(AppError::InvalidJson);
    }
    serde_json::from_value(value).map_err(|_| AppError::InvalidJson)
}

fn strip_outer_quotes(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|t| t.strip_suffix(q))
            .map(str::trim)
    })
}

pub async fn method_not_allowed() -> impl IntoResponse {
    AppError::MethodNotAllowed
}

pub async fn not_found() -> impl IntoResponse {
    AppError::NotFound("Not found".to_string())
}
