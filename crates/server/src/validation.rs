//! Tool argument validation against the advertised input schema.

use jsonschema::Validator;
use jsonschema::error::ValidationErrorKind;
use serde_json::{Map, Value, json};

/// Rejected arguments: a one-line message plus structured violations for the JSON-RPC
/// error `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArguments {
    pub message: String,
    pub data: Value,
}

/// Check `args` against `schema` (already compiled into `validator`).
///
/// Unknown parameters get did-you-mean suggestions; missing required parameters and
/// type/range violations are each reported once.
///
/// # Errors
///
/// Returns [`InvalidArguments`] listing every violation found.
pub fn validate_tool_arguments(
    schema: &Map<String, Value>,
    validator: &Validator,
    args: &Value,
) -> Result<(), InvalidArguments> {
    let props = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();

    let empty = Map::new();
    let args_obj = args.as_object().unwrap_or(&empty);
    let valid_params: Vec<&str> = props.keys().map(String::as_str).collect();

    let mut violations: Vec<Value> = Vec::new();

    for k in args_obj.keys() {
        if props.contains_key(k) {
            continue;
        }
        violations.push(json!({
            "type": "invalid-parameter",
            "parameter": k,
            "suggestions": find_similar_strings(k, &valid_params),
            "validParameters": valid_params,
        }));
    }

    for r in &required {
        if !args_obj.contains_key(*r) {
            violations.push(json!({
                "type": "missing-required-parameter",
                "parameter": r,
            }));
        }
    }

    for e in validator.iter_errors(args) {
        // Already reported above with a nicer shape.
        if matches!(
            e.kind(),
            ValidationErrorKind::Required { .. } | ValidationErrorKind::AdditionalProperties { .. }
        ) {
            continue;
        }
        violations.push(json!({
            "type": "constraint-violation",
            "message": e.to_string(),
            "instancePath": e.instance_path().to_string(),
        }));
    }

    if violations.is_empty() {
        return Ok(());
    }

    Err(InvalidArguments {
        message: summarize(&violations),
        data: json!({
            "type": "validation-errors",
            "violations": violations,
        }),
    })
}

fn summarize(violations: &[Value]) -> String {
    let first_of = |kind: &str| {
        violations
            .iter()
            .find(|v| v.get("type").and_then(Value::as_str) == Some(kind))
    };

    if let Some(v) = first_of("invalid-parameter") {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        let suggestion = v
            .get("suggestions")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str);
        return match suggestion {
            Some(s) => format!("Invalid params: unknown parameter '{p}' (did you mean '{s}'?)"),
            None => format!("Invalid params: unknown parameter '{p}'"),
        };
    }
    if let Some(v) = first_of("missing-required-parameter") {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        return format!("Invalid params: missing required parameter '{p}'");
    }
    if let [only] = violations {
        let msg = only.get("message").and_then(Value::as_str).unwrap_or("?");
        let path = only
            .get("instancePath")
            .and_then(Value::as_str)
            .unwrap_or("");
        return if path.is_empty() {
            format!("Invalid params: {msg}")
        } else {
            format!("Invalid params: {path}: {msg}")
        };
    }
    format!(
        "Invalid params: validation failed with {} error(s)",
        violations.len()
    )
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Map<String, Value> {
        json!({
            "type": "object",
            "properties": {
                "projectId": {"type": "string"},
                "testRunId": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100}
            },
            "required": ["testRunId"],
            "additionalProperties": false
        })
        .as_object()
        .cloned()
        .expect("object schema")
    }

    fn check(args: &Value) -> Result<(), InvalidArguments> {
        let schema = schema();
        let validator =
            jsonschema::validator_for(&Value::Object(schema.clone())).expect("valid schema");
        validate_tool_arguments(&schema, &validator, args)
    }

    #[test]
    fn valid_arguments_pass() {
        check(&json!({"testRunId": "run_1", "limit": 10})).expect("valid");
    }

    #[test]
    fn unknown_parameter_gets_suggestion() {
        let err = check(&json!({"testRunId": "run_1", "projectID": "p"})).unwrap_err();
        assert_eq!(
            err.message,
            "Invalid params: unknown parameter 'projectID' (did you mean 'projectId'?)"
        );
        // additionalProperties is reported once, as invalid-parameter.
        assert_eq!(err.data["violations"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn missing_required_is_named() {
        let err = check(&json!({})).unwrap_err();
        assert_eq!(
            err.message,
            "Invalid params: missing required parameter 'testRunId'"
        );
    }

    #[test]
    fn out_of_range_limit_is_a_constraint_violation() {
        let err = check(&json!({"testRunId": "run_1", "limit": 0})).unwrap_err();
        let violations = err.data["violations"].as_array().expect("violations");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0]["type"], "constraint-violation");
        assert_eq!(violations[0]["instancePath"], "/limit");
        assert!(err.message.starts_with("Invalid params: /limit"));
    }
}
