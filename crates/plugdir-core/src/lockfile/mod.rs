//! Lockfile recording which artifact each link resolved to.

pub mod store;
pub mod types;

pub use store::LockfileStore;
pub use types::{LOCKFILE_VERSION, LockedPlugin, Lockfile};
