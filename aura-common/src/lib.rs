//! # AuraLab Common Library
//!
//! Shared code for AuraLab services:
//! - Error type and result alias
//! - Root folder and TOML configuration resolution
//! - SQLite pool bootstrap
//! - Timestamp and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
