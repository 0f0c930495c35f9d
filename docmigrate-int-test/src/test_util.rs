use docmigrate::client::memory::InMemoryClient;
use docmigrate::client::DocumentClient;
use docmigrate::common::Document;
use docmigrate::driver::{DocumentDriver, DriverBuilder, LockingConfig};
use docmigrate::errors::MigrateResult;
use std::io::Cursor;
use std::time::Instant;

/// Runs a test between a setup and a teardown step.
///
/// The teardown runs even when the test returns an error. Errors and panics
/// are reported with the elapsed time and fail the test.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> MigrateResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> MigrateResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> MigrateResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| match before() {
        Ok(ctx) => match test(ctx.clone()) {
            Ok(_) => after(ctx).map_err(|e| format!("After run failed: {:?}", e)),
            Err(e) => {
                let _ = after(ctx);
                Err(format!("Test failed: {:?}", e))
            }
        },
        Err(e) => Err(format!("Before run failed: {:?}", e)),
    });

    let elapsed = start_time.elapsed();
    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            eprintln!("\n==================== TEST FAILED ({:?}) ====================", elapsed);
            panic!("{}", e);
        }
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            eprintln!("\n==================== TEST PANICKED ({:?}) ====================", elapsed);
            panic!("Panic: {}", err_msg);
        }
    }
}

/// A fresh in-memory server and a database name no other test uses.
#[derive(Clone)]
pub struct TestContext {
    memory: InMemoryClient,
    database: String,
}

impl TestContext {
    pub fn new(memory: InMemoryClient, database: &str) -> Self {
        Self {
            memory,
            database: database.to_string(),
        }
    }

    /// The in-memory server, for fail points, counters and data inspection.
    pub fn memory(&self) -> InMemoryClient {
        self.memory.clone()
    }

    pub fn client(&self) -> DocumentClient {
        self.memory.clone().into_client()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// A builder already pointed at this context's client and database.
    pub fn builder(&self) -> DriverBuilder {
        DocumentDriver::builder()
            .client(self.client())
            .database(&self.database)
    }

    pub fn driver(&self) -> MigrateResult<DocumentDriver> {
        self.builder().build()
    }

    pub fn locking_driver(&self) -> MigrateResult<DocumentDriver> {
        self.builder().locking(LockingConfig::enabled()).build()
    }

    pub fn transactional_driver(&self) -> MigrateResult<DocumentDriver> {
        self.builder().transactions(true).build()
    }

    /// Documents of a collection of this context's database.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.memory.documents(&self.database, collection)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.memory.collection_names(&self.database)
    }
}

pub fn random_database_name() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}

pub fn create_test_context() -> MigrateResult<TestContext> {
    Ok(TestContext::new(InMemoryClient::default(), &random_database_name()))
}

/// Clears fail points and drops every collection the test created.
pub fn cleanup(ctx: TestContext) -> MigrateResult<()> {
    let memory = ctx.memory();
    memory.clear_fail_points();

    let database = ctx.client().database(ctx.database());
    for name in ctx.collection_names() {
        let mut command = Document::new();
        command.put("drop", name.as_str())?;
        database.run_command(&command, None)?;
    }
    Ok(())
}

/// A migration payload readable by `run_migration`.
pub fn migration(json: &str) -> Cursor<Vec<u8>> {
    Cursor::new(json.as_bytes().to_vec())
}
