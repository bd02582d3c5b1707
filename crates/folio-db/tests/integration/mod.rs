mod catalog_tests;
mod job_store_tests;
