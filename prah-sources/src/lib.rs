//! Session data sources for PRAH

pub mod cache;
pub mod demo;

pub use cache::FileCacheSource;
pub use demo::DemoSource;
