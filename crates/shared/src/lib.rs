//! GymTrack Shared Types and Utilities
//!
//! This crate contains types, errors, and settings shared across the GymTrack platform.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigError, GymSettings};
pub use error::*;
pub use types::*;
