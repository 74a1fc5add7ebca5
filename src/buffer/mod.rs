//! Storage primitives
//!
//! - `pool`: fixed-capacity slab with generational handles
//! - `string`: growable, length-prefixed string

pub mod pool;
pub mod string;

pub use pool::{FreeSlots, Handle, Pool, PoolError, MAX_POOL_CAPACITY};
pub use string::BvrString;
