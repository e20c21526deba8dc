//! Memory state records and the write-through store that owns them.

pub mod state;
pub mod store;

pub use state::{Maturity, MaturityCounts, MemoryState};
pub use store::MemoryStateStore;
