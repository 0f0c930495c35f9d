use docmigrate::common::Value;
use docmigrate::driver::{CommandBatch, MigrationDriver};
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, migration, run_test};
use std::io::{self, Read};

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"))
    }
}

#[test]
fn test_malformed_payloads_issue_no_calls() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            for payload in [
                "",
                "not json",
                r#"[{create: "a"}]"#,
                r#"{"create": "a"}"#,
                r#"[{"create": "a"}, 42]"#,
                r#"[{"create": "a"}"#,
                r#"[{"insert": "a", "documents": [{"_id": {"$oid": "xyz"}}]}]"#,
            ] {
                let err = driver.run_migration(&mut migration(payload)).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::PayloadParseError, "payload {}", payload);
            }
            assert_eq!(ctx.memory().total_operations(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_failure_issues_no_calls() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            let err = driver.run_migration(&mut BrokenReader).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::PayloadReadError);
            assert_eq!(ctx.memory().total_operations(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_migration_succeeds_without_calls() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            driver.run_migration(&mut migration("[]"))?;
            driver.run_migration(&mut migration("  [ ]\n"))?;
            assert_eq!(ctx.memory().total_operations(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_extended_json_values_reach_the_database() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.run_migration(&mut migration(
                r#"[{"insert": "events", "documents": [{
                    "_id": {"$oid": "5f1d7f3e9d1e8b3a4c2b1a09"},
                    "at": {"$date": "2024-03-01T12:00:00Z"},
                    "count": {"$numberLong": "9007199254740993"},
                    "small": {"$numberInt": "7"},
                    "price": {"$numberDecimal": "19.99"},
                    "blob": {"$binary": {"base64": "AQID", "subType": "00"}}
                }]}]"#,
            ))?;

            let events = ctx.documents("events");
            assert_eq!(events.len(), 1);
            let event = &events[0];
            assert_eq!(
                event.get("_id").and_then(|v| v.as_object_id()).map(|id| id.to_hex()),
                Some("5f1d7f3e9d1e8b3a4c2b1a09".to_string())
            );
            assert!(event.get("at").and_then(|v| v.as_date_time()).is_some());
            assert_eq!(event.get("count"), Some(&Value::I64(9007199254740993)));
            assert_eq!(event.get("small"), Some(&Value::I32(7)));
            assert_eq!(event.get("price"), Some(&Value::Decimal("19.99".to_string())));
            assert_eq!(
                event.get("blob"),
                Some(&Value::Binary {
                    subtype: 0,
                    bytes: vec![1, 2, 3]
                })
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_command_batch_parse() {
    let batch = CommandBatch::parse(br#"[{"ping": 1}, {"create": "x", "capped": false}]"#).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.commands()[1].keys().collect::<Vec<_>>(), vec!["create", "capped"]);
}
