//! Extended JSON conversion.
//!
//! Migration payloads are standard JSON that may carry the database's
//! extended-type wrappers, in canonical or relaxed form:
//!
//! | Wrapper                                         | Value              |
//! |-------------------------------------------------|--------------------|
//! | `{"$oid": "<24 hex>"}`                          | `Value::ObjectId`  |
//! | `{"$date": "<ISO-8601>" \| <millis> \| {"$numberLong": "<millis>"}}` | `Value::DateTime` |
//! | `{"$numberInt": "<i32>"}`                       | `Value::I32`       |
//! | `{"$numberLong": "<i64>"}`                      | `Value::I64`       |
//! | `{"$numberDouble": "<f64>"}`                    | `Value::F64`       |
//! | `{"$numberDecimal": "<decimal>"}`               | `Value::Decimal`   |
//! | `{"$binary": {"base64": "..", "subType": "00"}}`| `Value::Binary`    |
//! | `{"$timestamp": {"t": .., "i": ..}}`            | `Value::Timestamp` |
//! | `{"$regularExpression": {"pattern": .., "options": ..}}` | `Value::Regex` |
//! | `{"$regex": "<pattern>", "$options": "<flags>"}` (legacy) | `Value::Regex` |
//! | `{"$symbol": "<string>"}`                       | `Value::Symbol`    |
//! | `{"$code": "<js>"}`, `{"$code": .., "$scope": {..}}` | `Value::JavaScript` |
//! | `{"$undefined": true}`                          | `Value::Undefined` |
//! | `{"$minKey": 1}`, `{"$maxKey": 1}`              | `Value::MinKey`, `Value::MaxKey` |
//!
//! Objects whose keys merely start with `$` (update operators such as `$set`,
//! or a `$regex` query operator without `$options`) stay ordinary documents.

use crate::common::{Document, ObjectId, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Number, Value as JsonValue};

/// Parses a migration payload into its ordered list of command documents.
///
/// # Errors
///
/// Returns [ErrorKind::PayloadParseError] if the payload is not valid JSON, if
/// the top level is not an array, if an element is not an object, or if an
/// extended-type wrapper is malformed.
pub fn parse_command_batch(payload: &[u8]) -> MigrateResult<Vec<Document>> {
    let json: JsonValue = serde_json::from_slice(payload)?;
    let items = match json {
        JsonValue::Array(items) => items,
        other => {
            return Err(parse_error(&format!(
                "migration must be a JSON array of command documents, found {}",
                json_type_name(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            JsonValue::Object(map) => document_from_json(map).map_err(|e| {
                MigrateError::new_with_cause(
                    &format!("invalid command at position {}", position),
                    ErrorKind::PayloadParseError,
                    e,
                )
            }),
            other => Err(parse_error(&format!(
                "command at position {} must be a JSON object, found {}",
                position,
                json_type_name(&other)
            ))),
        })
        .collect()
}

/// Converts a JSON value, resolving extended-type wrappers.
pub fn value_from_json(json: JsonValue) -> MigrateResult<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(b)),
        JsonValue::Number(n) => Ok(number_to_value(&n)),
        JsonValue::String(s) => Ok(Value::String(s)),
        JsonValue::Array(items) => items
            .into_iter()
            .map(value_from_json)
            .collect::<MigrateResult<Vec<_>>>()
            .map(Value::Array),
        JsonValue::Object(map) => object_to_value(map),
    }
}

/// Converts a JSON object into a document without treating the object itself
/// as a wrapper. Nested values are still resolved.
pub fn document_from_json(map: Map<String, JsonValue>) -> MigrateResult<Document> {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.put(&key, value_from_json(value)?)?;
    }
    Ok(doc)
}

/// Renders a value as relaxed extended JSON.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::I32(v) => JsonValue::from(*v),
        Value::I64(v) => JsonValue::from(*v),
        Value::F64(v) => match Number::from_f64(*v) {
            Some(n) => JsonValue::Number(n),
            None => json!({ "$numberDouble": format_special_double(*v) }),
        },
        Value::Decimal(d) => json!({ "$numberDecimal": d }),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Document(doc) => document_to_json(doc),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::DateTime(dt) => {
            json!({ "$date": dt.to_rfc3339_opts(SecondsFormat::Millis, true) })
        }
        Value::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        Value::Binary { subtype, bytes } => json!({
            "$binary": { "base64": STANDARD.encode(bytes), "subType": format!("{:02x}", subtype) }
        }),
        Value::Timestamp { time, increment } => {
            json!({ "$timestamp": { "t": time, "i": increment } })
        }
        Value::Regex { pattern, options } => json!({
            "$regularExpression": { "pattern": pattern, "options": options }
        }),
        Value::Symbol(symbol) => json!({ "$symbol": symbol }),
        Value::JavaScript { code, scope: None } => json!({ "$code": code }),
        Value::JavaScript {
            code,
            scope: Some(scope),
        } => json!({ "$code": code, "$scope": document_to_json(scope) }),
        Value::Undefined => json!({ "$undefined": true }),
        Value::MinKey => json!({ "$minKey": 1 }),
        Value::MaxKey => json!({ "$maxKey": 1 }),
    }
}

/// Renders a document as relaxed extended JSON, keeping key order.
pub fn document_to_json(doc: &Document) -> JsonValue {
    let map: Map<String, JsonValue> = doc
        .iter()
        .map(|(k, v)| (k.to_string(), value_to_json(v)))
        .collect();
    JsonValue::Object(map)
}

fn object_to_value(mut map: Map<String, JsonValue>) -> MigrateResult<Value> {
    if map.len() == 1 {
        let key = map.keys().next().cloned().unwrap_or_default();
        if is_wrapper_key(&key) {
            let inner = map.remove(&key).unwrap_or(JsonValue::Null);
            return wrapper_to_value(&key, inner);
        }
    }

    if map.len() == 2 && map.contains_key("$binary") && map.contains_key("$type") {
        let data = map.remove("$binary").unwrap_or(JsonValue::Null);
        let subtype = map.remove("$type").unwrap_or(JsonValue::Null);
        return legacy_binary(data, subtype);
    }

    if map.len() == 2 && map.contains_key("$code") && map.contains_key("$scope") {
        let code = map.remove("$code").unwrap_or(JsonValue::Null);
        let code = expect_str("$code", &code)?.to_string();
        let scope = match map.remove("$scope") {
            Some(JsonValue::Object(fields)) => document_from_json(fields)?,
            _ => return Err(parse_error("$scope must be an object")),
        };
        return Ok(Value::JavaScript {
            code,
            scope: Some(scope),
        });
    }

    if map.len() == 2 {
        if let (Some(JsonValue::String(pattern)), Some(JsonValue::String(options))) =
            (map.get("$regex"), map.get("$options"))
        {
            return Ok(Value::Regex {
                pattern: pattern.clone(),
                options: options.clone(),
            });
        }
    }

    document_from_json(map).map(Value::Document)
}

fn is_wrapper_key(key: &str) -> bool {
    matches!(
        key,
        "$oid"
            | "$date"
            | "$numberInt"
            | "$numberLong"
            | "$numberDouble"
            | "$numberDecimal"
            | "$binary"
            | "$timestamp"
            | "$regularExpression"
            | "$symbol"
            | "$code"
            | "$undefined"
            | "$minKey"
            | "$maxKey"
    )
}

fn wrapper_to_value(key: &str, inner: JsonValue) -> MigrateResult<Value> {
    match key {
        "$oid" => {
            let hex = expect_str(key, &inner)?;
            ObjectId::parse_str(hex)
                .map(Value::ObjectId)
                .map_err(|e| MigrateError::new_with_cause("invalid $oid", ErrorKind::PayloadParseError, e))
        }
        "$date" => parse_date(inner).map(Value::DateTime),
        "$numberInt" => {
            let s = expect_str(key, &inner)?;
            s.parse::<i32>()
                .map(Value::I32)
                .map_err(|_| parse_error(&format!("invalid $numberInt '{}'", s)))
        }
        "$numberLong" => {
            let s = expect_str(key, &inner)?;
            s.parse::<i64>()
                .map(Value::I64)
                .map_err(|_| parse_error(&format!("invalid $numberLong '{}'", s)))
        }
        "$numberDouble" => {
            let s = expect_str(key, &inner)?;
            parse_double(s).map(Value::F64)
        }
        "$numberDecimal" => {
            let s = expect_str(key, &inner)?;
            if s.is_empty() {
                return Err(parse_error("empty $numberDecimal"));
            }
            Ok(Value::Decimal(s.to_string()))
        }
        "$binary" => match inner {
            JsonValue::Object(mut fields) => {
                let data = fields.remove("base64").unwrap_or(JsonValue::Null);
                let subtype = fields.remove("subType").unwrap_or(JsonValue::Null);
                legacy_binary(data, subtype)
            }
            _ => Err(parse_error("$binary must be an object with base64 and subType")),
        },
        "$timestamp" => {
            let fields = match inner {
                JsonValue::Object(fields) => fields,
                _ => return Err(parse_error("$timestamp must be an object with t and i")),
            };
            let time = fields.get("t").and_then(JsonValue::as_u64);
            let increment = fields.get("i").and_then(JsonValue::as_u64);
            match (time, increment) {
                (Some(t), Some(i)) if t <= u32::MAX as u64 && i <= u32::MAX as u64 => {
                    Ok(Value::Timestamp {
                        time: t as u32,
                        increment: i as u32,
                    })
                }
                _ => Err(parse_error("$timestamp requires unsigned 32-bit t and i")),
            }
        }
        "$regularExpression" => {
            let fields = match inner {
                JsonValue::Object(fields) => fields,
                _ => return Err(parse_error("$regularExpression must be an object")),
            };
            let pattern = fields.get("pattern").and_then(JsonValue::as_str);
            let options = fields.get("options").and_then(JsonValue::as_str);
            match (pattern, options) {
                (Some(p), Some(o)) => Ok(Value::Regex {
                    pattern: p.to_string(),
                    options: o.to_string(),
                }),
                _ => Err(parse_error("$regularExpression requires pattern and options strings")),
            }
        }
        "$symbol" => expect_str(key, &inner).map(|s| Value::Symbol(s.to_string())),
        "$code" => expect_str(key, &inner).map(|code| Value::JavaScript {
            code: code.to_string(),
            scope: None,
        }),
        "$undefined" => match inner {
            JsonValue::Bool(true) => Ok(Value::Undefined),
            _ => Err(parse_error("$undefined must be true")),
        },
        "$minKey" | "$maxKey" => match inner.as_i64() {
            Some(1) if key == "$minKey" => Ok(Value::MinKey),
            Some(1) => Ok(Value::MaxKey),
            _ => Err(parse_error(&format!("{} must be 1", key))),
        },
        other => Err(parse_error(&format!("unsupported extended json type {}", other))),
    }
}

fn parse_date(inner: JsonValue) -> MigrateResult<DateTime<Utc>> {
    match inner {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| parse_error(&format!("invalid $date '{}': {}", s, e))),
        JsonValue::Number(n) => match n.as_i64() {
            Some(millis) => millis_to_date(millis),
            None => Err(parse_error(&format!("invalid $date millis {}", n))),
        },
        JsonValue::Object(mut fields) if fields.len() == 1 && fields.contains_key("$numberLong") => {
            let long = fields.remove("$numberLong").unwrap_or(JsonValue::Null);
            let s = expect_str("$numberLong", &long)?;
            let millis = s
                .parse::<i64>()
                .map_err(|_| parse_error(&format!("invalid $date millis '{}'", s)))?;
            millis_to_date(millis)
        }
        other => Err(parse_error(&format!(
            "$date must be a string, integer or $numberLong, found {}",
            json_type_name(&other)
        ))),
    }
}

fn millis_to_date(millis: i64) -> MigrateResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| parse_error(&format!("$date millis {} out of range", millis)))
}

fn parse_double(s: &str) -> MigrateResult<f64> {
    match s {
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => s
            .parse::<f64>()
            .map_err(|_| parse_error(&format!("invalid $numberDouble '{}'", s))),
    }
}

fn format_special_double(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

fn legacy_binary(data: JsonValue, subtype: JsonValue) -> MigrateResult<Value> {
    let data = expect_str("base64", &data)?;
    let subtype = expect_str("subType", &subtype)?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| parse_error(&format!("invalid base64 in $binary: {}", e)))?;
    let subtype = u8::from_str_radix(subtype, 16)
        .map_err(|_| parse_error(&format!("invalid $binary subType '{}'", subtype)))?;
    Ok(Value::Binary { subtype, bytes })
}

fn number_to_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Value::I32(small),
            Err(_) => Value::I64(i),
        }
    } else {
        // u64 above i64::MAX and fractional numbers
        Value::F64(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn expect_str<'a>(key: &str, value: &'a JsonValue) -> MigrateResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| parse_error(&format!("{} must be a string", key)))
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn parse_error(message: &str) -> MigrateError {
    MigrateError::new(message, ErrorKind::PayloadParseError)
}
