//! PRAH Core Library
//!
//! This crate provides the session data model, the data source trait, and the
//! reshaping pipeline that turns a loaded session into JSON-friendly tables.

pub mod error;
pub mod model;
pub mod normalize;
pub mod reshape;
pub mod source;
pub mod summary;
pub mod units;

pub use error::{NormalizeError, SourceError};
pub use model::Session;
pub use reshape::{build_bundle, SessionBundle, TableMask};
pub use source::{LoadOptions, SessionKind, SessionSource};
pub use units::Timedelta;
