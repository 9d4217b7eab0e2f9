//! Common test utilities for package lifecycle tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
