//! Common utilities and definitions shared across modules
//!
//! Error types, configuration and the constant tables (modifier bits,
//! safety caps) used throughout the front end.

pub mod config;
pub mod consts;
pub mod error;

pub use config::Config;
pub use consts::*;
pub use error::{Error, Result};
