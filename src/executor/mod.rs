//! Executor Module
//!
//! Drives the store client for writes and reads.
//!
//! ## Responsibilities
//! - Mutation: validate rows, partition them into batches and run one
//!   transaction per batch, strictly one after another
//! - Query: build key filters and follow continuation tokens until the
//!   result set is complete
//!
//! Neither executor spawns concurrent work; each awaits one store call
//! before issuing the next.

mod mutation;
mod query;

pub use mutation::{MutationExecutor, WriteMode};
pub use query::QueryExecutor;
