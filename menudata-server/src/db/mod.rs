//! Database layer - pool lifecycle and record execution
//!
//! - One pool per process, built and probed at startup
//! - Requests only borrow connections; the handle is never replaced
//! - Rows are returned as key-ordered JSON records

pub mod pool;
pub mod records;

pub use pool::{bootstrap_pool, BootstrapError, DatabaseTarget, PoolManager, PoolSettings};
pub use records::{DbError, MemorySource, Record, RecordSource};
