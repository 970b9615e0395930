//! Configuration module: compile-time limits plus runtime user preferences.

pub mod constants;
pub mod runtime;
