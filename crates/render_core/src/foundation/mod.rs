//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types and operations
//! - Logging utilities

pub mod logging;
pub mod math;
