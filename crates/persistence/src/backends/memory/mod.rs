//! In-memory document store backend.
//!
//! Always available. Implements the filter operators emitted by
//! [`crate::search::DocumentFilterBuilder`] (`$in`, `$gte`, `$gt`, `$lt`,
//! `$lte`, `$ne`, `$exists`, `$size`, `$or`, `$and`), dotted paths through
//! arrays, sort/skip/limit, unique compound indexes and buffered
//! transactions.

mod filter;
mod store;
mod transaction;

pub use store::MemoryDocumentStore;
pub use transaction::MemoryTransaction;
