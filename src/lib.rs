//! Library-loan choropleth of Finnish municipalities.
//!
//! The core is UI-agnostic: statistics are indexed once at load time, and a
//! [`sync::SyncController`] keeps the selection and the displayed year
//! consistent for whichever views draw from it.

pub mod color;
pub mod data;
pub mod error;
pub mod selection;
pub mod stats_reader;
pub mod sync;
pub mod year;

pub use error::{AtlasError, Result};
