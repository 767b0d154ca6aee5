//! CLI command implementations.

pub mod common;
pub mod design;
pub mod process;
pub mod verify;
