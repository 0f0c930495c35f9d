use chrono::Utc;
use docmigrate::client::memory::Operation;
use docmigrate::driver::{LockingConfig, MigrationDriver};
use docmigrate_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_lock_disabled_is_a_no_op() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.lock()?;
            driver.lock()?;
            driver.unlock()?;
            driver.unlock()?;

            assert!(!driver.is_locked());
            assert_eq!(ctx.memory().total_operations(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_build_creates_lock_index() {
    run_test(
        create_test_context,
        |ctx| {
            let _driver = ctx.locking_driver()?;
            let indexes = ctx
                .memory()
                .index_names(ctx.database(), "migrate_advisory_lock");
            assert!(indexes.contains(&"lock_unique_key".to_string()));
            assert_eq!(ctx.memory().operation_count(Operation::CreateIndex), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_lock_stores_holder_record() {
    run_test(
        create_test_context,
        |ctx| {
            let before = Utc::now();
            let driver = ctx.locking_driver()?;
            driver.lock()?;
            assert!(driver.is_locked());

            let records = ctx.documents("migrate_advisory_lock");
            assert_eq!(records.len(), 1);
            let record = &records[0];
            assert_eq!(record.get("locking_key").and_then(|v| v.as_i64()), Some(0));
            assert_eq!(
                record.get("pid").and_then(|v| v.as_i64()),
                Some(std::process::id() as i64)
            );
            let hostname = record.get("hostname").and_then(|v| v.as_str()).unwrap();
            assert!(!hostname.is_empty());
            let created_at = record.get("created_at").and_then(|v| v.as_date_time()).unwrap();
            assert!(created_at >= before - chrono::Duration::seconds(1));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_double_lock_inserts_once() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.locking_driver()?;
            driver.lock()?;
            driver.lock()?;
            assert_eq!(ctx.memory().operation_count(Operation::Insert), 1);
            assert_eq!(ctx.documents("migrate_advisory_lock").len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unlock_is_idempotent() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.locking_driver()?;
            driver.lock()?;
            driver.unlock()?;
            driver.unlock()?;

            assert!(!driver.is_locked());
            assert!(ctx.documents("migrate_advisory_lock").is_empty());
            assert_eq!(ctx.memory().operation_count(Operation::Delete), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_lock_can_be_taken_again_after_unlock() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.locking_driver()?;
            for _ in 0..3 {
                driver.lock()?;
                driver.unlock()?;
            }
            assert_eq!(ctx.memory().operation_count(Operation::Insert), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_custom_locking_names() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx
                .builder()
                .locking(
                    LockingConfig::enabled()
                        .with_collection_name("locks")
                        .with_index_name("locks_key"),
                )
                .build()?;
            driver.lock()?;

            assert_eq!(ctx.documents("locks").len(), 1);
            assert!(ctx
                .memory()
                .index_names(ctx.database(), "locks")
                .contains(&"locks_key".to_string()));
            assert!(ctx.documents("migrate_advisory_lock").is_empty());
            driver.unlock()?;
            Ok(())
        },
        cleanup,
    )
}
