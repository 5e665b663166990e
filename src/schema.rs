//! Structural validation of manifest JSON.
//!
//! Runs on the raw `serde_json::Value` before typed decoding so every problem
//! in a document is reported at once, with a JSON-pointer-ish location.

use crate::issues::IssueKind;
use crate::manifest::{MANIFEST_VERSION, parse_iso_timestamp};
use serde_json::{Map, Value};

const TIMESTAMP_SOURCES: &[&str] = &["exif", "filename", "filesystem", "unknown"];
const RUN_STATUSES: &[&str] = &["completed", "completed_with_warnings", "failed"];

/// Check a manifest document. Returns every violation found; empty means valid.
pub fn validate_value(value: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    let Some(obj) = value.as_object() else {
        return vec!["manifest must be a JSON object".to_string()];
    };

    match obj.get("version") {
        Some(Value::String(v)) if v == MANIFEST_VERSION => {}
        Some(Value::String(v)) => problems.push(format!(
            "version: unsupported '{v}' (expected '{MANIFEST_VERSION}')"
        )),
        Some(_) => problems.push("version: must be a string".into()),
        None => problems.push("missing required field 'version'".into()),
    }

    require_string(obj, "collection_name", "", &mut problems);
    optional_string(obj, "collection_description", "", &mut problems);

    match obj.get("generated_at") {
        Some(Value::String(s)) if parse_iso_timestamp(s).is_some() => {}
        Some(Value::String(s)) => {
            problems.push(format!("generated_at: '{s}' is not an ISO-8601 timestamp"))
        }
        Some(_) => problems.push("generated_at: must be a string".into()),
        None => problems.push("missing required field 'generated_at'".into()),
    }

    match obj.get("pics") {
        Some(Value::Array(pics)) => {
            for (i, pic) in pics.iter().enumerate() {
                validate_pic(pic, &format!("pics[{i}]"), &mut problems);
            }
        }
        Some(_) => problems.push("pics: must be an array".into()),
        None => problems.push("missing required field 'pics'".into()),
    }

    match obj.get("config") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => problems.push("config: must be an object or null".into()),
    }

    for field in ["errors", "warnings"] {
        validate_issue_list(obj.get(field), field, &mut problems);
    }

    match obj.get("processing_status") {
        None | Some(Value::Null) => {}
        Some(Value::Object(status)) => validate_status(status, &mut problems),
        Some(_) => problems.push("processing_status: must be an object".into()),
    }

    problems
}

fn validate_pic(pic: &Value, at: &str, problems: &mut Vec<String>) {
    let Some(obj) = pic.as_object() else {
        problems.push(format!("{at}: must be an object"));
        return;
    };

    for field in ["source_path", "dest_path", "hash"] {
        require_string(obj, field, at, problems);
    }
    match obj.get("size_bytes") {
        Some(v) if v.is_u64() => {}
        Some(_) => problems.push(format!("{at}.size_bytes: must be a non-negative integer")),
        None => problems.push(format!("{at}: missing required field 'size_bytes'")),
    }
    match obj.get("mtime") {
        None | Some(Value::Null) | Some(Value::Number(_)) => {}
        Some(_) => problems.push(format!("{at}.mtime: must be a number or null")),
    }
    match obj.get("timestamp") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if parse_iso_timestamp(s).is_some() => {}
        Some(_) => problems.push(format!("{at}.timestamp: must be an ISO-8601 string or null")),
    }
    match obj.get("timestamp_source") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if TIMESTAMP_SOURCES.contains(&s.as_str()) => {}
        Some(other) => problems.push(format!(
            "{at}.timestamp_source: {other} is not one of {TIMESTAMP_SOURCES:?} or null"
        )),
    }
    optional_string(obj, "camera", at, problems);
    match obj.get("gps") {
        None | Some(Value::Null) => {}
        Some(Value::Object(gps)) => {
            check_range(gps, "lat", 90.0, &format!("{at}.gps"), problems);
            check_range(gps, "lon", 180.0, &format!("{at}.gps"), problems);
        }
        Some(_) => problems.push(format!("{at}.gps: must be an object or null")),
    }
    validate_issue_list(obj.get("errors"), &format!("{at}.errors"), problems);
}

fn validate_issue_list(list: Option<&Value>, at: &str, problems: &mut Vec<String>) {
    match list {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_issue(item, &format!("{at}[{i}]"), problems);
            }
        }
        Some(_) => problems.push(format!("{at}: must be an array")),
    }
}

fn validate_issue(issue: &Value, at: &str, problems: &mut Vec<String>) {
    let Some(obj) = issue.as_object() else {
        problems.push(format!("{at}: must be an object"));
        return;
    };
    match obj.get("error_type") {
        Some(Value::String(s)) if IssueKind::ALL.iter().any(|k| k.as_str() == s) => {}
        Some(other) => problems.push(format!("{at}.error_type: unknown kind {other}")),
        None => problems.push(format!("{at}: missing required field 'error_type'")),
    }
    require_string(obj, "source_file", at, problems);
    optional_string(obj, "details", at, problems);
}

fn validate_status(status: &Map<String, Value>, problems: &mut Vec<String>) {
    match status.get("status") {
        Some(Value::String(s)) if RUN_STATUSES.contains(&s.as_str()) => {}
        Some(other) => problems.push(format!(
            "processing_status.status: {other} is not one of {RUN_STATUSES:?}"
        )),
        None => problems.push("processing_status: missing required field 'status'".into()),
    }
    for field in ["total_files", "processed_successfully"] {
        match status.get(field) {
            Some(v) if v.is_u64() => {}
            Some(_) => problems.push(format!(
                "processing_status.{field}: must be a non-negative integer"
            )),
            None => problems.push(format!("processing_status: missing required field '{field}'")),
        }
    }
    for field in ["warnings_count", "errors_count", "files_skipped"] {
        if let Some(v) = status.get(field)
            && !v.is_u64()
        {
            problems.push(format!(
                "processing_status.{field}: must be a non-negative integer"
            ));
        }
    }
}

fn require_string(obj: &Map<String, Value>, field: &str, at: &str, problems: &mut Vec<String>) {
    match obj.get(field) {
        Some(Value::String(_)) => {}
        Some(_) => problems.push(format!("{}: must be a string", path(at, field))),
        None if at.is_empty() => problems.push(format!("missing required field '{field}'")),
        None => problems.push(format!("{at}: missing required field '{field}'")),
    }
}

fn optional_string(obj: &Map<String, Value>, field: &str, at: &str, problems: &mut Vec<String>) {
    match obj.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => problems.push(format!("{}: must be a string or null", path(at, field))),
    }
}

fn check_range(
    obj: &Map<String, Value>,
    field: &str,
    limit: f64,
    at: &str,
    problems: &mut Vec<String>,
) {
    match obj.get(field).and_then(Value::as_f64) {
        Some(v) if (-limit..=limit).contains(&v) => {}
        Some(v) => problems.push(format!("{at}.{field}: {v} is outside [-{limit}, {limit}]")),
        None => problems.push(format!("{at}: missing numeric field '{field}'")),
    }
}

fn path(at: &str, field: &str) -> String {
    if at.is_empty() {
        field.to_string()
    } else {
        format!("{at}.{field}")
    }
}
