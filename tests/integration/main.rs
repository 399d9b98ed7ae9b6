//! Integration tests for scholar-sweep
//!
//! These tests serve search pages, proxy lists and PDFs from wiremock
//! servers and drive the crate through real HTTP.

mod crawl_tests;
mod proxy_tests;
