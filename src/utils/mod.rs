//! Shared helpers.

pub mod dial_code;
pub mod retry;
