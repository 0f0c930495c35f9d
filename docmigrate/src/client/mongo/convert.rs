use crate::common::{Document, ObjectId, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use chrono::{TimeZone, Utc};
use mongodb::bson::{self, spec::BinarySubtype, Bson};
use serde_json::json;

/// Converts a document into BSON, keeping key order.
pub fn to_bson_document(document: &Document) -> MigrateResult<bson::Document> {
    let mut converted = bson::Document::new();
    for (key, value) in document.iter() {
        converted.insert(key, to_bson(value)?);
    }
    Ok(converted)
}

/// Converts a BSON document, keeping key order.
pub fn from_bson_document(document: bson::Document) -> MigrateResult<Document> {
    let mut converted = Document::new();
    for (key, value) in document {
        converted.put(&key, from_bson(value)?)?;
    }
    Ok(converted)
}

pub fn to_bson(value: &Value) -> MigrateResult<Bson> {
    let converted = match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::I32(v) => Bson::Int32(*v),
        Value::I64(v) => Bson::Int64(*v),
        Value::F64(v) => Bson::Double(*v),
        Value::Decimal(d) => Bson::try_from(json!({ "$numberDecimal": d })).map_err(|e| {
            MigrateError::new(
                &format!("invalid decimal '{}': {}", d, e),
                ErrorKind::InvalidDocument,
            )
        })?,
        Value::String(s) => Bson::String(s.clone()),
        Value::Document(d) => Bson::Document(to_bson_document(d)?),
        Value::Array(items) => Bson::Array(
            items
                .iter()
                .map(to_bson)
                .collect::<MigrateResult<Vec<_>>>()?,
        ),
        Value::DateTime(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis())),
        Value::ObjectId(oid) => Bson::ObjectId(bson::oid::ObjectId::from_bytes(oid.bytes())),
        Value::Binary { subtype, bytes } => Bson::Binary(bson::Binary {
            subtype: BinarySubtype::from(*subtype),
            bytes: bytes.clone(),
        }),
        Value::Timestamp { time, increment } => Bson::Timestamp(bson::Timestamp {
            time: *time,
            increment: *increment,
        }),
        Value::Regex { pattern, options } => Bson::RegularExpression(bson::Regex {
            pattern: pattern.clone(),
            options: sorted_options(options),
        }),
        Value::Symbol(s) => Bson::Symbol(s.clone()),
        Value::JavaScript { code, scope: None } => Bson::JavaScriptCode(code.clone()),
        Value::JavaScript {
            code,
            scope: Some(scope),
        } => Bson::JavaScriptCodeWithScope(bson::JavaScriptCodeWithScope {
            code: code.clone(),
            scope: to_bson_document(scope)?,
        }),
        Value::Undefined => Bson::Undefined,
        Value::MinKey => Bson::MinKey,
        Value::MaxKey => Bson::MaxKey,
    };
    Ok(converted)
}

pub fn from_bson(value: Bson) -> MigrateResult<Value> {
    let converted = match value {
        Bson::Double(v) => Value::F64(v),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_bson)
                .collect::<MigrateResult<Vec<_>>>()?,
        ),
        Bson::Document(d) => Value::Document(from_bson_document(d)?),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null => Value::Null,
        Bson::RegularExpression(regex) => Value::Regex {
            pattern: regex.pattern,
            options: regex.options,
        },
        Bson::JavaScriptCode(code) => Value::JavaScript { code, scope: None },
        Bson::JavaScriptCodeWithScope(js) => Value::JavaScript {
            code: js.code,
            scope: Some(from_bson_document(js.scope)?),
        },
        Bson::Int32(v) => Value::I32(v),
        Bson::Int64(v) => Value::I64(v),
        Bson::Timestamp(ts) => Value::Timestamp {
            time: ts.time,
            increment: ts.increment,
        },
        Bson::Binary(binary) => Value::Binary {
            subtype: u8::from(binary.subtype),
            bytes: binary.bytes,
        },
        Bson::ObjectId(oid) => Value::ObjectId(ObjectId::from_bytes(oid.bytes())),
        Bson::DateTime(dt) => {
            let millis = dt.timestamp_millis();
            let converted = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                MigrateError::new(
                    &format!("date {} is out of range", millis),
                    ErrorKind::InvalidDocument,
                )
            })?;
            Value::DateTime(converted)
        }
        Bson::Symbol(s) => Value::Symbol(s),
        Bson::Decimal128(d) => {
            let json = Bson::Decimal128(d).into_canonical_extjson();
            match json.get("$numberDecimal").and_then(|v| v.as_str()) {
                Some(s) => Value::Decimal(s.to_string()),
                None => {
                    return Err(MigrateError::new(
                        "decimal cannot be rendered",
                        ErrorKind::InvalidDocument,
                    ))
                }
            }
        }
        Bson::Undefined => Value::Undefined,
        Bson::MaxKey => Value::MaxKey,
        Bson::MinKey => Value::MinKey,
        other => {
            return Err(MigrateError::new(
                &format!("unsupported BSON type {:?}", other.element_type()),
                ErrorKind::InvalidDocument,
            ))
        }
    };
    Ok(converted)
}

// the server expects regex flags in alphabetical order
fn sorted_options(options: &str) -> String {
    let mut flags: Vec<char> = options.chars().collect();
    flags.sort_unstable();
    flags.into_iter().collect()
}
