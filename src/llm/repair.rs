//! Fault-tolerant tool-call argument decoding
//!
//! LLMs emit tool-call arguments as JSON-ish strings and regularly fail to
//! escape quotation marks inside string-valued fields, most often code or
//! file content. Repair is schema-guided: the known field names bound each
//! value segment, so a quote inside one field can never corrupt another.
//! Strict parsing is tried first, keeping the common non-buggy case a
//! single-pass parse with no escaping overhead.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};

/// Parse a raw tool-call argument string, repairing unescaped quotes when
/// strict parsing fails.
///
/// `schema_fields` are the field names of the tool being invoked; without
/// them a malformed payload cannot be repaired and a descriptive error is
/// returned. Idempotent on already-valid JSON.
pub fn repair_arguments(raw: &str, schema_fields: &[&str]) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => {
            return Err(Error::Arguments(format!(
                "Arguments must be a JSON object, got: {}",
                other
            )))
        }
        Err(_) => {}
    }

    if schema_fields.is_empty() {
        return Err(Error::Arguments(format!(
            "Cannot repair arguments without a tool schema: {}",
            raw
        )));
    }

    let repaired = repair_unescaped_quotes(raw, schema_fields);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Error::Arguments(format!(
            "Failed to parse or repair arguments: {}",
            raw
        ))),
    }
}

/// Escape unescaped `"` inside each schema field's value segment.
///
/// The string is partitioned by `"<field>":"` prefixes; a value runs from
/// the end of its prefix to the start of the next one (or the end of the
/// document). The prefix itself and the value's closing punctuation are
/// left untouched.
fn repair_unescaped_quotes(json: &str, fields: &[&str]) -> String {
    let alternation = fields
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    let prefix = match Regex::new(&format!(r#""({})"\s*:\s*""#, alternation)) {
        Ok(re) => re,
        Err(_) => return json.to_string(),
    };

    let matches: Vec<(usize, usize)> = prefix.find_iter(json).map(|m| (m.start(), m.end())).collect();

    let mut out = String::with_capacity(json.len() + 16);
    let mut cursor = 0;
    for (i, &(start, end)) in matches.iter().enumerate() {
        out.push_str(&json[cursor..start]);
        out.push_str(&json[start..end]);

        let segment_end = matches.get(i + 1).map(|&(s, _)| s).unwrap_or(json.len());
        let segment = &json[end..segment_end];
        let (value, tail) = split_value_segment(segment);
        out.push_str(&escape_unescaped_quotes(value));
        out.push_str(tail);
        cursor = segment_end;
    }
    out.push_str(&json[cursor..]);
    out
}

/// Split a segment into the value proper and its closing punctuation.
///
/// A segment ends either with `",` before the next field prefix or with
/// `"}` at the end of the document. When the expected closer is missing the
/// whole segment is treated as value; the re-parse will then surface the
/// failure.
fn split_value_segment(segment: &str) -> (&str, &str) {
    let trimmed = segment.trim_end();
    let body = if let Some(stripped) = trimmed.strip_suffix(',') {
        stripped.trim_end()
    } else if let Some(stripped) = trimmed.strip_suffix('}') {
        stripped.trim_end()
    } else {
        return (segment, "");
    };

    match body.strip_suffix('"') {
        Some(value) => (value, &segment[value.len()..]),
        None => (segment, ""),
    }
}

/// Escape every `"` not already preceded by an odd run of backslashes
fn escape_unescaped_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut backslashes = 0usize;
    for c in value.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_fast_path() {
        let raw = r#"{"file":"/tmp/a.py","content":"print(1)"}"#;
        let parsed = repair_arguments(raw, &["file", "content"]).unwrap();
        assert_eq!(parsed["file"], "/tmp/a.py");
        assert_eq!(parsed["content"], "print(1)");
    }

    #[test]
    fn test_valid_json_needs_no_schema() {
        let raw = r#"{"url":"https://example.com"}"#;
        let parsed = repair_arguments(raw, &[]).unwrap();
        assert_eq!(parsed["url"], "https://example.com");
    }

    #[test]
    fn test_repair_unescaped_quotes_in_content() {
        let raw = r#"{"file":"/tmp/a.py","content":"print("hi")"}"#;
        let parsed = repair_arguments(raw, &["file", "content"]).unwrap();
        assert_eq!(parsed["file"], "/tmp/a.py");
        assert_eq!(parsed["content"], "print(\"hi\")");
    }

    #[test]
    fn test_repair_quotes_in_middle_field() {
        let raw = r#"{"content":"say "hello" twice","file":"/tmp/b.txt"}"#;
        let parsed = repair_arguments(raw, &["content", "file"]).unwrap();
        assert_eq!(parsed["content"], "say \"hello\" twice");
        assert_eq!(parsed["file"], "/tmp/b.txt");
    }

    #[test]
    fn test_already_escaped_quotes_left_alone() {
        let raw = r#"{"content":"print(\"hi\") and then "more""}"#;
        let parsed = repair_arguments(raw, &["content"]).unwrap();
        assert_eq!(parsed["content"], "print(\"hi\") and then \"more\"");
    }

    #[test]
    fn test_malformed_without_schema_errors() {
        let raw = r#"{"content":"print("hi")"}"#;
        let err = repair_arguments(raw, &[]).unwrap_err();
        assert!(err.to_string().contains("without a tool schema"));
    }

    #[test]
    fn test_unrepairable_carries_raw_text() {
        let raw = r#"{"content": not even close"#;
        let err = repair_arguments(raw, &["content"]).unwrap_err();
        assert!(err.to_string().contains("Failed to parse or repair"));
        assert!(err.to_string().contains("not even close"));
    }

    #[test]
    fn test_non_object_json_rejected() {
        let err = repair_arguments("[1,2,3]", &["content"]).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn test_idempotent_on_valid_json() {
        let raw = r#"{"regex":"a+b*","message":"fine"}"#;
        let direct: Map<String, Value> = serde_json::from_str(raw).unwrap();
        let repaired = repair_arguments(raw, &["regex", "message"]).unwrap();
        assert_eq!(direct, repaired);
    }
}
