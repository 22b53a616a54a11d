//! # RangeStream Testkit
//!
//! Test utilities for RangeStream.
//!
//! This crate provides:
//! - Backend fixtures with automatic cleanup
//! - A fault-injecting list engine for exercising delete failure paths
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rangestream_testkit::prelude::*;
//!
//! #[test]
//! fn appends_survive_reopen() {
//!     let fixture = TestBackend::file();
//!     let stream = fixture.get_stream("s").unwrap();
//!     stream.add("x").unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
