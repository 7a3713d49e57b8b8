//! # Shelfmark Common Library
//!
//! Shared code for Shelfmark services:
//! - Error type used across service boundaries
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
