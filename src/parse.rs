use std::collections::HashMap;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::flag_value::FlagValue;
use crate::operator::Operator;

const FLAGS_KEY: &str = "flags";

/// Build a name → [Flag] mapping from a flag document of the form
/// `{"flags": [{"name": ..., "description": ..., "value": ..., "operation": ...}, ...]}`.
///
/// Records that are not objects, or that lack a string name, are skipped with a warning. A
/// description that is not a string is dropped with a warning. A document without a `flags`
/// array, a bad operation, or a value that cannot be classified fails the whole parse. When two
/// records share a name, the later one wins.
pub fn parse_flags(document: &Value) -> Result<HashMap<String, Flag>> {
    let records = document
        .get(FLAGS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::InvalidStructure(format!("expected an object with a '{}' array", FLAGS_KEY))
        })?;

    let mut flags = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let record = match record.as_object() {
            Some(record) => record,
            None => {
                warn!("flag record {} is not an object, skipping", index);
                continue;
            }
        };

        if let Some(flag) = parse_record(record)? {
            if let Some(previous) = flags.insert(flag.name().to_string(), flag) {
                debug!("duplicate flag {} replaced by a later record", previous.name());
            }
        }
    }

    Ok(flags)
}

/// Decode `bytes` as JSON and parse the result with [parse_flags].
pub fn parse_flags_slice(bytes: &[u8]) -> Result<HashMap<String, Flag>> {
    let document: Value = serde_json::from_slice(bytes)?;
    parse_flags(&document)
}

impl Flag {
    /// See [parse_flags].
    pub fn from_json(document: &Value) -> Result<HashMap<String, Flag>> {
        parse_flags(document)
    }
}

fn parse_record(record: &Map<String, Value>) -> Result<Option<Flag>> {
    let name = match record.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        None | Some(Value::Null) | Some(Value::String(_)) => {
            warn!("found flag without name, skipping");
            return Ok(None);
        }
        Some(other) => {
            warn!("found flag with non-string name {}, skipping", other);
            return Ok(None);
        }
    };

    let description = match record.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(description)) => Some(description),
        Some(other) => {
            warn!(
                "ignoring non-string description {} of flag {}",
                other, name
            );
            None
        }
    };

    let operation = match record.get("operation") {
        None | Some(Value::Null) => None,
        Some(Value::String(op)) => Some(Operator::from_name(op).map_err(|e| {
            Error::InvalidData(format!("operation of flag {}: {}", name, e))
        })?),
        Some(other) => {
            return Err(Error::InvalidData(format!(
                "operation of flag {} must be a string, got {}",
                name, other
            )))
        }
    };

    let value = record.get("value").map(FlagValue::from).unwrap_or_default();
    let mut flag = Flag::new(name.as_str(), value)
        .map_err(|e| Error::InvalidData(format!("value of flag {}: {}", name, e)))?;
    if let Some(description) = description {
        flag = flag.with_description(description.as_str());
    }
    if let Some(operation) = operation {
        flag = flag.with_operation(operation);
    }

    Ok(Some(flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::captured_logs;
    use crate::value_type::ValueType;
    use log::Level;
    use serde_json::json;
    use spectral::prelude::*;
    use test_case::test_case;

    #[test]
    fn parses_flags() {
        let document = json!({
            "flags": [
                {
                    "name": "test",
                    "description": "a test",
                    "value": "testflag",
                    "operation": "eq"
                }
            ]
        });

        let flags = Flag::from_json(&document).unwrap();
        let flag = &flags["test"];
        assert_that!(flag.name()).is_equal_to("test");
        assert_that!(flag.description()).is_equal_to(Some("a test"));
        assert_that!(flag.value()).is_equal_to(&FlagValue::from("testflag"));
        assert_that!(flag.operation()).is_equal_to(Some(Operator::Eq));
        assert_that!(flag.status()).is_true();
        assert_that!(flag.is_enabled_for("testflag")).is_true();
        assert_that!(flag.is_enabled_for("different_test")).is_false();
    }

    #[test]
    fn optional_fields_default_to_absent() {
        let flags = parse_flags(&json!({"flags": [{"name": "bare"}]})).unwrap();
        let flag = &flags["bare"];
        assert_that!(flag.description()).is_none();
        assert_that!(flag.operation()).is_none();
        assert_that!(flag.value_type()).is_equal_to(ValueType::Null);
        assert_that!(flag.is_enabled(None)).is_false();

        let flags = parse_flags(&json!({"flags": [
            {"name": "nulls", "description": null, "value": 3, "operation": null}
        ]}))
        .unwrap();
        assert_that!(flags["nulls"].operation()).is_none();
        assert_that!(flags["nulls"].is_enabled(None)).is_true();
    }

    #[test]
    fn empty_flag_list() {
        assert!(parse_flags(&json!({"flags": []})).unwrap().is_empty());
    }

    #[test_case(json!({}); "missing flags key")]
    #[test_case(json!({"not_flags": []}); "wrong key")]
    #[test_case(json!({"flags": {"name": "test", "value": "testflag", "operation": "eq"}}); "flags is an object")]
    #[test_case(json!({"flags": "test"}); "flags is a string")]
    #[test_case(json!([]); "document is an array")]
    fn rejects_invalid_structure(document: Value) {
        assert!(matches!(
            parse_flags(&document),
            Err(Error::InvalidStructure(_))
        ));
    }

    #[test]
    fn skips_flag_without_name() {
        let document = json!({
            "flags": [
                {"description": "a test", "value": "testflag", "operation": "eq"},
                {"name": "", "value": true},
                {"name": "kept", "value": true}
            ]
        });

        let (result, logs) = captured_logs(|| parse_flags(&document));
        let flags = result.unwrap();
        assert_eq!(flags.keys().collect::<Vec<_>>(), vec!["kept"]);

        let warnings: Vec<_> = logs
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.as_str())
            .collect();
        assert_eq!(
            warnings,
            vec![
                "found flag without name, skipping",
                "found flag without name, skipping"
            ]
        );
    }

    #[test_case(json!(123); "numeric operation")]
    #[test_case(json!(["eq"]); "array operation")]
    #[test_case(json!("equals"); "unknown operation")]
    #[test_case(json!(""); "empty operation")]
    fn rejects_invalid_operation(operation: Value) {
        let document = json!({
            "flags": [
                {"name": "ok", "value": true},
                {"name": "test", "description": "a test", "value": "testflag", "operation": operation}
            ]
        });

        let err = parse_flags(&document).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().starts_with("invalid input data"));
    }

    #[test]
    fn rejects_unclassifiable_value() {
        let document = json!({"flags": [
            {"name": "good", "value": true},
            {"name": "x", "value": {"a": 1}}
        ]});
        assert!(matches!(parse_flags(&document), Err(Error::InvalidData(_))));
    }

    #[test_case(json!({"name": 5, "value": true}), "found flag with non-string name 5, skipping"; "numeric name")]
    #[test_case(json!({"name": ["x"], "value": true}), "found flag with non-string name [\"x\"], skipping"; "array name")]
    #[test_case(json!("junk"), "flag record 1 is not an object, skipping"; "string record")]
    #[test_case(json!(null), "flag record 1 is not an object, skipping"; "null record")]
    fn skips_malformed_record_and_keeps_the_rest(bad: Value, warning: &str) {
        let document = json!({"flags": [
            {"name": "good", "value": true},
            bad,
            {"name": "also_good", "value": 1}
        ]});

        let (result, logs) = captured_logs(|| parse_flags(&document));
        let flags = result.unwrap();
        assert_eq!(flags.len(), 2);
        assert_that!(flags["good"].status()).is_true();
        assert_that!(flags["also_good"].status()).is_true();
        assert!(logs.contains(&(Level::Warn, warning.to_string())));
    }

    #[test_case(json!(5); "numeric description")]
    #[test_case(json!(true); "boolean description")]
    #[test_case(json!({"text": "d"}); "object description")]
    fn drops_non_string_description(description: Value) {
        let document = json!({"flags": [
            {"name": "good", "value": true},
            {"name": "x", "description": description, "value": true}
        ]});

        let (result, logs) = captured_logs(|| parse_flags(&document));
        let flags = result.unwrap();
        assert_eq!(flags.len(), 2);
        assert_that!(flags["x"].description()).is_none();
        assert_that!(flags["x"].status()).is_true();
        assert!(logs.iter().any(|(level, message)| *level == Level::Warn
            && message.starts_with("ignoring non-string description")));
    }

    #[test]
    fn later_duplicates_win() {
        let flags = parse_flags(&json!({"flags": [
            {"name": "dup", "value": false},
            {"name": "dup", "value": true}
        ]}))
        .unwrap();
        assert_eq!(flags.len(), 1);
        assert_that!(flags["dup"].status()).is_true();
    }

    #[test]
    fn parses_bytes() {
        let flags = parse_flags_slice(br#"{"flags": [{"name": "f", "value": [1, 2.5]}]}"#).unwrap();
        assert_that!(flags["f"].value_type()).is_equal_to(ValueType::Array);

        assert!(matches!(
            parse_flags_slice(b"not json"),
            Err(Error::Decode(_))
        ));
    }
}
