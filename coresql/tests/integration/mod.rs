#![cfg(feature = "test-utils")]

mod truncate_test;
mod wait_test;
