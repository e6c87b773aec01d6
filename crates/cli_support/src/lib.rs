//! Shared CLI argument groups.

pub mod common;
