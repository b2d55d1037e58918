//! LiveChat Shared Types and Utilities
//!
//! This crate contains the domain types and database helpers shared
//! across the LiveChat backend.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
