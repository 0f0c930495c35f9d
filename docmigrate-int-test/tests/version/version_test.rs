use docmigrate::client::memory::{FailPoint, Operation};
use docmigrate::client::OperationOptions;
use docmigrate::doc;
use docmigrate::driver::{MigrationDriver, NO_MIGRATION_VERSION};
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_empty_database_has_no_version() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            assert_eq!(driver.get_version()?, (NO_MIGRATION_VERSION, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_set_version_round_trip() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            for (version, dirty) in [(0, false), (1, true), (1, false), (20240101, true)] {
                driver.set_version(version, dirty)?;
                assert_eq!(driver.get_version()?, (version, dirty));
            }
            assert_eq!(ctx.documents("schema_migrations").len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_version_record_layout() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(4, true)?;

            let records = ctx.documents("schema_migrations");
            let record = &records[0];
            assert_eq!(record.get("version").and_then(|v| v.as_i64()), Some(4));
            assert_eq!(record.get("dirty").and_then(|v| v.as_bool()), Some(true));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_version_is_shared_between_drivers() {
    run_test(
        create_test_context,
        |ctx| {
            let writer = ctx.driver()?;
            let reader = ctx.transactional_driver()?;
            writer.set_version(9, false)?;
            assert_eq!(reader.get_version()?, (9, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_record_without_dirty_flag_is_clean() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            ctx.client()
                .database(ctx.database())
                .collection("schema_migrations")
                .insert_one(doc! { "version": 12 }, &OperationOptions::unbounded())?;
            assert_eq!(driver.get_version()?, (12, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_out_of_range_version_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(3, false)?;
            let err = driver.set_version(u64::MAX, false).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidVersion);
            assert_eq!(driver.get_version()?, (3, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_interrupted_write_leaves_no_version() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(5, false)?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::Insert, ErrorKind::BackendError).times(1));

            let err = driver.set_version(6, true).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::VersionInsertFailed);
            assert_eq!(driver.get_version()?, (NO_MIGRATION_VERSION, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_failure_keeps_previous_version() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(5, false)?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::Drop, ErrorKind::BackendError).times(1));

            let err = driver.set_version(6, true).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::VersionDropFailed);
            assert_eq!(driver.get_version()?, (5, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_failure_is_reported() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            ctx.memory()
                .configure_fail_point(FailPoint::new(Operation::Find, ErrorKind::BackendError).times(1));
            let err = driver.get_version().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::VersionReadFailed);
            assert_eq!(driver.get_version()?, (NO_MIGRATION_VERSION, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reset_clears_state() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(2, true)?;
            driver.reset()?;
            assert_eq!(driver.get_version()?, (NO_MIGRATION_VERSION, false));
            assert!(!ctx.collection_names().contains(&"schema_migrations".to_string()));

            driver.reset()?;
            Ok(())
        },
        cleanup,
    )
}
