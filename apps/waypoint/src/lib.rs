//! # waypoint
//!
//! The async half of Waypoint: fetching the authoritative dataset, keeping
//! the redb mirror fresh, and loading runtime configuration.
//!
//! The wizard logic itself (navigation, compatibility, composition) lives in
//! `waypoint-core` and runs synchronously against the mirror.

pub mod config;
pub mod store;
pub mod sync;

pub use config::{LogFormat, WaypointConfig};
pub use store::{AuthoredDocument, AuthoritativeStore, FileStore, HttpStore, StoreBackend};
pub use sync::{CacheSynchronizer, SyncOutcome};
