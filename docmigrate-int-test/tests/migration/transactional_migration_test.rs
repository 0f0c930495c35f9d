use docmigrate::client::memory::{FailPoint, Operation};
use docmigrate::driver::MigrationDriver;
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, migration, run_test};

#[test]
fn test_commands_commit_together() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            driver.run_migration(&mut migration(
                r#"[
                    {"create": "orders"},
                    {"insert": "orders", "documents": [{"n": 1}, {"n": 2}, {"n": 3}]},
                    {"update": "orders", "updates": [{"q": {"n": 2}, "u": {"$set": {"vip": true}}}]}
                ]"#,
            ))?;

            let orders = ctx.documents("orders");
            assert_eq!(orders.len(), 3);
            assert_eq!(orders[1].get("vip").and_then(|v| v.as_bool()), Some(true));

            let memory = ctx.memory();
            assert_eq!(memory.operation_count(Operation::StartSession), 1);
            assert_eq!(memory.operation_count(Operation::StartTransaction), 1);
            assert_eq!(memory.operation_count(Operation::Command), 3);
            assert_eq!(memory.operation_count(Operation::Commit), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_command_failure_is_not_committed() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            let err = driver
                .run_migration(&mut migration(r#"[{}, {}]"#))
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert!(err.message().starts_with("failed to execute command 0"));

            let memory = ctx.memory();
            assert_eq!(memory.operation_count(Operation::Command), 1);
            assert_eq!(memory.operation_count(Operation::Commit), 0);
            assert_eq!(memory.operation_count(Operation::Abort), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_command_rolls_back_earlier_ones() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            let err = driver
                .run_migration(&mut migration(
                    r#"[{"create": "a"}, {"insert": "a", "documents": [{"x": 1}]}, {"drop": "missing"}]"#,
                ))
                .unwrap_err();

            assert_eq!(err.root_cause().kind(), &ErrorKind::NamespaceNotFound);
            assert!(ctx.collection_names().is_empty());
            assert!(ctx.documents("a").is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_commit_failure_is_reported() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::Commit, ErrorKind::BackendError).times(1));

            let err = driver
                .run_migration(&mut migration(r#"[{"create": "a"}, {"create": "b"}]"#))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionCommitFailed);
            assert_eq!(err.message(), "failed to commit transaction");
            assert!(ctx.collection_names().is_empty());

            driver.run_migration(&mut migration(r#"[{"create": "a"}, {"create": "b"}]"#))?;
            assert_eq!(ctx.collection_names(), vec!["a".to_string(), "b".to_string()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_transaction_start_failure_runs_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            ctx.memory().configure_fail_point(FailPoint::new(
                Operation::StartTransaction,
                ErrorKind::BackendError,
            ));

            let err = driver
                .run_migration(&mut migration(r#"[{"create": "a"}]"#))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionStartFailed);
            assert_eq!(ctx.memory().operation_count(Operation::Command), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_session_start_failure_runs_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::StartSession, ErrorKind::BackendError));

            let err = driver
                .run_migration(&mut migration(r#"[{"create": "a"}]"#))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionStartFailed);
            assert_eq!(ctx.memory().operation_count(Operation::StartTransaction), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_uncommitted_work_is_invisible_to_readers() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            driver.set_version(1, true)?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::Commit, ErrorKind::BackendError).times(1));

            let _ = driver.run_migration(&mut migration(r#"[{"drop": "schema_migrations"}]"#));
            assert_eq!(driver.get_version()?, (1, true));
            Ok(())
        },
        cleanup,
    )
}
