use docmigrate::driver::{DocumentDriver, LockingConfig, MigrationDriver};
use docmigrate::errors::ErrorKind;
use docmigrate_int_test::test_util::{cleanup, create_test_context, migration, run_test};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_exactly_one_racer_gets_the_lock() {
    run_test(
        create_test_context,
        |ctx| {
            let num_threads = 8;
            let barrier = Arc::new(Barrier::new(num_threads));
            let outcomes = Arc::new(Mutex::new(Vec::new()));

            let mut handles = vec![];
            for _ in 0..num_threads {
                let driver = ctx.locking_driver()?;
                let barrier = Arc::clone(&barrier);
                let outcomes = Arc::clone(&outcomes);

                handles.push(thread::spawn(move || {
                    barrier.wait();
                    let result = driver.lock();
                    outcomes
                        .lock()
                        .push(result.map_err(|e| *e.kind()));
                }));
            }
            for handle in handles {
                let _ = handle.join();
            }

            let outcomes = outcomes.lock();
            assert_eq!(outcomes.len(), num_threads);
            assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(outcomes
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|kind| *kind == ErrorKind::DatabaseLocked));
            assert_eq!(ctx.documents("migrate_advisory_lock").len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_locked_sections_never_overlap() {
    run_test(
        create_test_context,
        |ctx| {
            let num_threads = 4;
            let rounds = 25;
            let inside = Arc::new(AtomicUsize::new(0));
            let overlaps = Arc::new(AtomicUsize::new(0));
            let entries = Arc::new(AtomicUsize::new(0));

            let mut handles = vec![];
            for _ in 0..num_threads {
                let driver = ctx.locking_driver()?;
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                let entries = Arc::clone(&entries);

                handles.push(thread::spawn(move || {
                    let mut done = 0;
                    while done < rounds {
                        if driver.lock().is_err() {
                            thread::yield_now();
                            continue;
                        }
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        entries.fetch_add(1, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        let _ = driver.unlock();
                        done += 1;
                    }
                }));
            }
            for handle in handles {
                let _ = handle.join();
            }

            assert_eq!(overlaps.load(Ordering::SeqCst), 0);
            assert_eq!(entries.load(Ordering::SeqCst), num_threads * rounds);
            assert!(ctx.documents("migrate_advisory_lock").is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_transactional_migrations_on_separate_databases() {
    run_test(
        create_test_context,
        |ctx| {
            let num_threads = 4;
            let mut handles = vec![];
            for i in 0..num_threads {
                let driver = DocumentDriver::builder()
                    .client(ctx.client())
                    .database(&format!("{}_{}", ctx.database(), i))
                    .transactions(true)
                    .locking(LockingConfig::enabled())
                    .build()?;

                handles.push(thread::spawn(move || {
                    driver.lock()?;
                    driver.set_version(1, true)?;
                    driver.run_migration(&mut migration(
                        r#"[{"create": "items"}, {"insert": "items", "documents": [{"n": 1}, {"n": 2}]}]"#,
                    ))?;
                    driver.set_version(1, false)?;
                    driver.unlock()
                }));
            }

            for handle in handles {
                match handle.join() {
                    Ok(result) => result?,
                    Err(_) => panic!("migration thread panicked"),
                }
            }

            let memory = ctx.memory();
            for i in 0..num_threads {
                let database = format!("{}_{}", ctx.database(), i);
                assert_eq!(memory.documents(&database, "items").len(), 2);
                assert_eq!(memory.documents(&database, "schema_migrations").len(), 1);
            }
            Ok(())
        },
        cleanup,
    )
}
