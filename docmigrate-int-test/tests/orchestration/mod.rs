mod driver_builder_test;
mod migration_cycle_test;
