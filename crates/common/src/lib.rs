//! Shared types and error plumbing used across the felis crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::Mode,
};
