//! Testing utilities for plugin developers
//!
//! This module provides mocks that record every hook invocation so tests can
//! assert on call counts and ordering.

pub mod mocks;

pub use mocks::{HookProbe, MockPlugin};
