//! Foundation module - Core utilities and types
//!
//! This module provides the building blocks shared by every other module:
//! - Bounded keyed caches and generation-tagged cache locations
//! - Frame tick clock and stopwatch
//! - Logging bootstrap

pub mod collections;
pub mod time;
pub mod logging;
