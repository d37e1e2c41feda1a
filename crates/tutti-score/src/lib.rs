//! # tutti-score
//!
//! Document layer for tutti.
//!
//! This crate provides:
//! - Versioned composition documents with an applied-operation log
//! - Dot/index paths into an untyped content tree
//! - Path navigation (get/set/insert/remove) with a strict creation rule:
//!   intermediate segments must exist, only the leaf may be new
//! - Path-addressed operation records
//!
//! ## Example
//!
//! ```rust
//! use tutti_score::{navigate, ContentPath, ScoreDocument};
//! use serde_json::json;
//!
//! let mut doc = ScoreDocument::new("composition", json!({ "tempo": 96 }));
//! navigate::set(&mut doc.content, &ContentPath::parse("tempo"), json!(120)).unwrap();
//! assert_eq!(navigate::get(&doc.content, &ContentPath::parse("tempo")), Some(&json!(120)));
//! ```

pub mod document;
pub mod error;
pub mod navigate;
pub mod operation;
pub mod path;

pub use document::{DocumentId, ScoreDocument};
pub use error::ScoreError;
pub use operation::{Operation, OperationId, OperationInput, OperationKind};
pub use path::{ContentPath, PathSegment};
