mod payload_test;
mod sequential_migration_test;
mod transactional_migration_test;
