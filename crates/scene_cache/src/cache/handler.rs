//! Pluggable reaction to a failed cache rebuild

use std::sync::Arc;

use crate::assets::AssetError;

/// A rebuild could not fit every active scene into fresh caches
#[derive(thiserror::Error, Debug)]
#[error("cache rebuild #{rebuild} failed on scene '{scene}': {source}")]
pub struct ResolutionError {
    /// Sequence number of the failed rebuild
    pub rebuild: usize,
    /// First scene whose population failed
    pub scene: String,
    /// Loader error
    #[source]
    pub source: AssetError,
}

/// Callback receiving rebuild failures
pub type ResolutionErrorHandler = Arc<dyn Fn(&ResolutionError) + Send + Sync>;

/// Treats a failed rebuild as fatal: logs it and exits with status 1
pub fn default_resolution_error_handler() -> ResolutionErrorHandler {
    Arc::new(|err: &ResolutionError| {
        log::error!("Unrecoverable cache state: {err}");
        std::process::exit(1);
    })
}
