mod lock_test;
