//! Cache store backends.

mod memory;

pub use memory::{MemoryCacheStore, DEFAULT_MAX_ENTRIES};
