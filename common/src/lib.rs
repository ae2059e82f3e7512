//! Shared types for the rewrite-remote workspace.
//!
//! Kept free of third-party dependencies so both the remoting library and
//! the applications built on it can report errors the same way.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
