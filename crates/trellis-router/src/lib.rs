//! trellis-router: path segmenter and per-method route trie
//!
//! Single Source of Truth (SSOT) matcher used by trellis-core. The crate is
//! pure: no I/O, no locking. The tree exposes `&mut self` insertion and
//! `&self` resolution; the owning layer decides the locking discipline.
//!
//! ## Path Syntax
//! - `:name` - Named parameter (captures one segment)
//! - `*name` - Catch-all marker (captures one segment, lowest priority)
//!
//! ## Priority
//! 1. Exact literal match
//! 2. Wildcard match (parameter or catch-all)
//!
//! ## Example
//! ```
//! use trellis_router::{Resolution, RouteTree};
//!
//! let mut tree = RouteTree::new();
//! tree.insert("GET", "/users/:id", 1).unwrap();
//!
//! match tree.resolve("GET", "/users/42") {
//!     Resolution::Found { value, params } => {
//!         assert_eq!(value, 1);
//!         assert_eq!(params, vec![("id".to_string(), "42".to_string())]);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod segment;
pub mod tree;

pub use segment::{segment, PathSegment, PathSegments, SegmentKind, SEPARATOR};
pub use tree::{InsertError, Resolution, RouteTree, SUPPORTED_METHODS};
