//! Utility functions and helpers.

pub mod http;
pub mod pacing;
pub mod url;

pub use pacing::Pacer;
