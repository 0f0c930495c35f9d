use docmigrate::client::memory::{FailPoint, Operation};
use docmigrate::driver::MigrationDriver;
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, migration, run_test};

#[test]
fn test_commands_run_in_order() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.run_migration(&mut migration(
                r#"[
                    {"create": "users"},
                    {"insert": "users", "documents": [{"name": "ada"}, {"name": "alan"}]},
                    {"delete": "users", "deletes": [{"q": {"name": "alan"}, "limit": 1}]},
                    {"renameCollection": "users", "to": "people"}
                ]"#,
            ))?;

            assert_eq!(ctx.collection_names(), vec!["people".to_string()]);
            let people = ctx.documents("people");
            assert_eq!(people.len(), 1);
            assert_eq!(people[0].get("name").and_then(|v| v.as_str()), Some("ada"));
            assert_eq!(ctx.memory().operation_count(Operation::Command), 4);
            assert_eq!(ctx.memory().operation_count(Operation::StartSession), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_command_fails() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            let err = driver.run_migration(&mut migration("[{}]")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert!(err.message().starts_with("failed to execute command 0"));
            assert_eq!(ctx.memory().operation_count(Operation::Command), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failure_keeps_earlier_effects() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            let err = driver
                .run_migration(&mut migration(
                    r#"[{"create": "a"}, {"create": "a"}, {"create": "b"}]"#,
                ))
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert!(err.message().starts_with("failed to execute command 1"));
            assert_eq!(ctx.collection_names(), vec!["a".to_string()]);
            assert_eq!(ctx.memory().operation_count(Operation::Command), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_command_is_reported() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            let err = driver
                .run_migration(&mut migration(r#"[{"compactEverything": 1}]"#))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert_eq!(err.root_cause().kind(), &ErrorKind::CommandNotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_server_error_is_wrapped() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            ctx.memory().configure_fail_point(
                FailPoint::new(Operation::Command, ErrorKind::BackendError)
                    .command("insert")
                    .message("node is recovering"),
            );
            let err = driver
                .run_migration(&mut migration(
                    r#"[{"create": "a"}, {"insert": "a", "documents": [{"x": 1}]}]"#,
                ))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert_eq!(err.root_cause().message(), "node is recovering");
            assert!(ctx.documents("a").is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_index_violation_stops_migration() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            let err = driver
                .run_migration(&mut migration(
                    r#"[
                        {"createIndexes": "users", "indexes": [{"key": {"email": 1}, "name": "email_1", "unique": true}]},
                        {"insert": "users", "documents": [{"email": "a@x"}]},
                        {"insert": "users", "documents": [{"email": "a@x"}]}
                    ]"#,
                ))
                .unwrap_err();
            assert_eq!(err.root_cause().kind(), &ErrorKind::DuplicateKey);
            assert_eq!(ctx.documents("users").len(), 1);
            Ok(())
        },
        cleanup,
    )
}
