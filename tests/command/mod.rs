//! Command builder tests.

mod builder_test;
