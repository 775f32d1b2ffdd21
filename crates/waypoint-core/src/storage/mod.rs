//! # Storage Backends
//!
//! Persistent storage for the local mirror of the authoritative dataset.

pub mod redb_mirror;

pub use redb_mirror::RedbMirror;
