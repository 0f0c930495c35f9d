use docmigrate::client::memory::InMemoryClient;
use docmigrate::driver::{
    DocumentDriver, LockingConfig, MigrationDriver, DEFAULT_LOCKING_COLLECTION,
    DEFAULT_LOCK_INDEX_NAME, DEFAULT_MIGRATIONS_COLLECTION,
};
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_missing_database_name() {
    let err = DocumentDriver::new(InMemoryClient::default().into_client(), "")
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::NoDatabaseName);
    assert_eq!(err.message(), "no database name");
}

#[test]
fn test_missing_client() {
    let err = DocumentDriver::builder().database("app").build().err().unwrap();
    assert_eq!(err.kind(), &ErrorKind::NoClient);
}

#[test]
fn test_default_configuration() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            assert_eq!(driver.database_name(), ctx.database());
            assert_eq!(driver.migrations_collection(), DEFAULT_MIGRATIONS_COLLECTION);
            assert!(!driver.transaction_mode());
            assert!(!driver.locking().enabled);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_locking_defaults_fill_empty_names() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx
                .builder()
                .locking(LockingConfig {
                    enabled: true,
                    collection_name: String::new(),
                    index_name: "custom_index".to_string(),
                })
                .build()?;
            assert_eq!(driver.locking().collection_name, DEFAULT_LOCKING_COLLECTION);
            assert_eq!(driver.locking().index_name, "custom_index");
            assert_ne!(driver.locking().index_name, DEFAULT_LOCK_INDEX_NAME);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_migrations_collection_falls_back() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.builder().migrations_collection("").build()?;
            driver.set_version(1, false)?;
            assert_eq!(ctx.documents(DEFAULT_MIGRATIONS_COLLECTION).len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drivers_with_separate_collections_do_not_interfere() {
    run_test(
        create_test_context,
        |ctx| {
            let core = ctx.builder().migrations_collection("core_migrations").build()?;
            let plugin = ctx.builder().migrations_collection("plugin_migrations").build()?;

            core.set_version(10, false)?;
            plugin.set_version(2, true)?;
            assert_eq!(core.get_version()?, (10, false));
            assert_eq!(plugin.get_version()?, (2, true));

            plugin.reset()?;
            assert_eq!(core.get_version()?, (10, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_close_keeps_client_open() {
    run_test(
        create_test_context,
        |ctx| {
            let driver = ctx.driver()?;
            driver.set_version(3, false)?;
            driver.close()?;
            driver.close()?;

            let next = ctx.driver()?;
            assert_eq!(next.get_version()?, (3, false));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_driver_as_trait_object() {
    run_test(
        create_test_context,
        |ctx| {
            let driver: Box<dyn MigrationDriver> = Box::new(ctx.locking_driver()?);
            driver.lock()?;
            driver.set_version(1, false)?;
            assert_eq!(driver.get_version()?, (1, false));
            driver.unlock()?;
            driver.close()?;
            Ok(())
        },
        cleanup,
    )
}
