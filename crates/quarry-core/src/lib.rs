//! # quarry-core
//!
//! Core abstractions shared by the Quarry warehouse-job crates.
//!
//! This crate provides the foundational pieces used across all Quarry components:
//!
//! - **Error Types**: Shared error definitions and result types
//! - **Canonical JSON**: Deterministic encoding for content hashing
//! - **Observability**: Logging bootstrap and span helpers
//!
//! ## Crate Boundary
//!
//! `quarry-core` is the **only** crate allowed to define shared primitives.
//! Cross-crate interaction happens via the types defined here.
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::prelude::*;
//!
//! let bytes = to_canonical_bytes(&serde_json::json!({"b": 1, "a": 2}))?;
//! assert_eq!(bytes, br#"{"a":2,"b":1}"#);
//! # Ok::<(), quarry_core::canonical_json::CanonicalJsonError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod canonical_json;
pub mod error;
pub mod observability;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use quarry_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::canonical_json::{to_canonical_bytes, to_canonical_string};
    pub use crate::error::{Error, Result};
    pub use crate::observability::{LogFormat, init_logging};
}

// Re-export key types at crate root for ergonomics
pub use canonical_json::{CanonicalJsonError, to_canonical_bytes, to_canonical_string};
pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging, job_span};
