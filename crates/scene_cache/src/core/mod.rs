//! Core client configuration

pub mod config;

pub use config::{AssetMode, AssetSettings, CacheSettings, ClientConfig, LoadingSettings};
