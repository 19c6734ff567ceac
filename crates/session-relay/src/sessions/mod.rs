//! Session Management
//!
//! Tracks which sessions exist and whether they have started.

mod record;
mod registry;

pub use record::*;
pub use registry::*;
