//! Integration tests for Gallery-Mirror
//!
//! These tests run the whole pipeline against wiremock servers and temporary
//! directories.

mod mirror_tests;
