//! PRAH Server Library
//!
//! Exposes the HTTP API, configuration and CSV export for the binaries and
//! for integration testing.

pub mod api;
pub mod config;
pub mod export;
pub mod state;

use config::SourceKind;
use prah_core::SessionSource;
use prah_sources::{DemoSource, FileCacheSource};
use std::path::Path;
use std::sync::Arc;

/// Instantiate the configured session source
pub fn open_source(kind: SourceKind, cache_dir: &Path) -> Arc<dyn SessionSource> {
    match kind {
        SourceKind::Cache => Arc::new(FileCacheSource::new(cache_dir)),
        SourceKind::Demo => Arc::new(DemoSource::new()),
    }
}
