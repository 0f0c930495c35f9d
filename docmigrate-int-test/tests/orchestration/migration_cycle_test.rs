use docmigrate::driver::{DocumentDriver, LockingConfig, MigrationDriver, NO_MIGRATION_VERSION};
use docmigrate::errors::{ErrorKind, MigrateResult};
use docmigrate_int_test::test_util::{cleanup, create_test_context, migration, run_test};

const MIGRATIONS: [&str; 3] = [
    r#"[{"create": "users"}]"#,
    r#"[{"insert": "users", "documents": [{"name": "ada"}, {"name": "grace"}]}]"#,
    r#"[{"update": "users", "updates": [{"q": {}, "u": {"$set": {"active": true}}, "multi": true}]}]"#,
];

/// Applies every migration above the recorded version, the way an engine does.
fn migrate_up(driver: &DocumentDriver, migrations: &[&str]) -> MigrateResult<u64> {
    driver.lock()?;
    let (current, dirty) = driver.get_version()?;
    assert!(!dirty);

    let first = if current == NO_MIGRATION_VERSION { 0 } else { current + 1 };
    let mut applied = current;
    for version in first..migrations.len() as u64 {
        driver.set_version(version, true)?;
        if let Err(e) = driver.run_migration(&mut migration(migrations[version as usize])) {
            driver.unlock()?;
            return Err(e);
        }
        driver.set_version(version, false)?;
        applied = version;
    }
    driver.unlock()?;
    Ok(applied)
}

#[test]
fn test_full_cycle_sequential() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.locking_driver()?;
            assert_eq!(migrate_up(&driver, &MIGRATIONS)?, 2);
            assert_eq!(driver.get_version()?, (2, false));

            let users = ctx.documents("users");
            assert_eq!(users.len(), 2);
            assert!(users
                .iter()
                .all(|u| u.get("active").and_then(|v| v.as_bool()) == Some(true)));
            assert!(ctx.documents("migrate_advisory_lock").is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_full_cycle_transactional() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx
                .builder()
                .transactions(true)
                .locking(LockingConfig::enabled())
                .build()?;
            assert_eq!(migrate_up(&driver, &MIGRATIONS)?, 2);
            assert_eq!(ctx.documents("users").len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rerun_applies_nothing_new() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.locking_driver()?;
            migrate_up(&driver, &MIGRATIONS[..2])?;
            assert_eq!(driver.get_version()?, (1, false));

            assert_eq!(migrate_up(&driver, &MIGRATIONS)?, 2);
            assert_eq!(migrate_up(&driver, &MIGRATIONS)?, 2);
            assert_eq!(ctx.documents("users").len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_migration_leaves_dirty_version() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.transactional_driver()?;
            let broken = [MIGRATIONS[0], r#"[{"create": "users"}]"#];
            let err = migrate_up(&driver, &broken).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CommandExecutionFailed);
            assert_eq!(driver.get_version()?, (1, true));

            // operator repair: force the version back and reset state
            driver.set_version(0, false)?;
            assert_eq!(driver.get_version()?, (0, false));
            driver.reset()?;
            assert_eq!(driver.get_version()?, (NO_MIGRATION_VERSION, false));
            Ok(())
        },
        cleanup,
    )
}
