use docmigrate::client::memory::{InMemoryClient, Operation};
use docmigrate::driver::{DocumentDriver, LockingConfig, MigrationDriver, NO_MIGRATION_VERSION};
use docmigrate::errors::MigrateResult;
use docmigrate_int_test::test_util::{migration, random_database_name};

const MIGRATIONS: [&str; 3] = [
    r#"[{"create": "users"}, {"createIndexes": "users", "indexes": [{"key": {"email": 1}, "name": "email_1", "unique": true}]}]"#,
    r#"[{"insert": "users", "documents": [{"email": "ada@example.com", "joined": {"$date": "2024-01-01T00:00:00Z"}}, {"email": "alan@example.com"}]}]"#,
    r#"[{"update": "users", "updates": [{"q": {}, "u": {"$set": {"active": true}}, "multi": true}]}]"#,
];

fn main() -> MigrateResult<()> {
    colog::init();

    let memory = InMemoryClient::default();
    let database = random_database_name();
    let driver = DocumentDriver::builder()
        .client(memory.clone().into_client())
        .database(&database)
        .locking(LockingConfig::enabled())
        .transactions(true)
        .verbose_logging(true)
        .build()?;

    driver.lock()?;
    let (current, dirty) = driver.get_version()?;
    if dirty {
        log::error!("Database {} is dirty at version {}", database, current);
        driver.unlock()?;
        return Ok(());
    }

    let start = std::time::Instant::now();
    let first = if current == NO_MIGRATION_VERSION { 0 } else { current as usize + 1 };
    for (version, payload) in MIGRATIONS.iter().enumerate().skip(first) {
        let version = version as u64;
        driver.set_version(version, true)?;
        driver.run_migration(&mut migration(payload))?;
        driver.set_version(version, false)?;
        log::info!("Applied migration {}", version);
    }
    driver.unlock()?;
    driver.close()?;

    let (version, dirty) = driver.get_version()?;
    println!(
        "Database {} at version {} (dirty: {}) after {:?}",
        database,
        version,
        dirty,
        start.elapsed()
    );
    println!(
        "users: {} document(s), {} command(s), {} commit(s)",
        memory.documents(&database, "users").len(),
        memory.operation_count(Operation::Command),
        memory.operation_count(Operation::Commit)
    );
    Ok(())
}
