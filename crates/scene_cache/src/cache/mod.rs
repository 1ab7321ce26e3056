//! Global cache generation and exhaustion recovery
//!
//! The live sprite and sound caches are published together as one
//! [`CacheGeneration`]. Normal frames populate scenes into the live
//! generation; when a loader reports exhaustion the [`CacheResolver`]
//! rebuilds a fresh generation holding only what active scenes reference
//! and swaps it in.

pub mod generation;
pub mod handler;
pub mod population;
pub mod resolver;
pub mod state;

pub use generation::{CacheGeneration, GlobalCaches};
pub use handler::{default_resolution_error_handler, ResolutionError, ResolutionErrorHandler};
pub use population::{Completion, Populator};
pub use resolver::CacheResolver;
pub use state::{CacheState, CacheStateCell};
