//! Key/value cache with per-key expiry.
//!
//! [`CacheStore`] fronts one of two backends chosen once at start-up: a
//! remote REST key/value service when credentials are configured, otherwise
//! an in-process map. Callers never see which one is active.

pub mod error;
mod memory;
mod remote;
mod store;

pub use error::CacheError;
pub use memory::{MemoryStore, DEFAULT_TTL};
pub use remote::RemoteStore;
pub use store::{CacheMode, CacheStatus, CacheStore};
