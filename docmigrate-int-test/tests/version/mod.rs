mod version_test;
