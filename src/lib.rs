//! Oxircs: RCS (`,v`) revision files from flat-file backup histories.
//!
//! Numbered backup copies of a file (`notes.txt.0`, `notes.txt.1`, ...,
//! `notes.txt`) are turned into a single RCS file whose trunk revisions
//! `1.1 ..= 1.N` follow the copies oldest to newest.
//!
//! The crate provides:
//! - Snapshot discovery and ordering (`group`)
//! - Revision chain construction with reverse deltas (`chain`, `delta`)
//! - The RCS format: serializer, quoting and a reader (`rcs`)
//! - Author and log message resolution (`meta`)
//! - File-oriented import drivers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use oxircs::delta::DiffBackend;
//! use oxircs::io::{ImportOptions, import_to_path};
//! use oxircs::meta::NullResolver;
//!
//! let copies: Vec<PathBuf> = ["notes.txt.0", "notes.txt.1", "notes.txt"]
//!     .iter()
//!     .map(PathBuf::from)
//!     .collect();
//! let opts = ImportOptions {
//!     diff: DiffBackend::Builtin,
//!     ..ImportOptions::default()
//! };
//! let stats = import_to_path(&copies, "notes.txt,v".as_ref(), &NullResolver, &opts).unwrap();
//! assert_eq!(stats.head.to_string(), "1.3");
//! ```

pub mod chain;
pub mod delta;
pub mod error;
pub mod group;
pub mod io;
pub mod meta;
pub mod rcs;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::ImportError;
