//! Chain-core: the object database's domain layer (§4). Wraps
//! [`deip_chainbase::Database`] with the transaction/block pipeline,
//! operation evaluators, and the domain services they call into.
//!
//! Nothing here runs a network or a scheduler — those are
//! `deip-consensus`'s and `deip-node`'s job. This crate only answers
//! "given this database and this transaction/block, what happens".

pub mod context;
pub mod eci;
pub mod evaluators;
pub mod events;
pub mod fork;
pub mod pipeline;
pub mod services;
pub mod skip;
pub mod token_sale;
pub mod validation;

pub use context::EvalContext;
pub use events::{Notification, Notifier, PipelineHooks};
pub use fork::ForkDatabase;
pub use pipeline::{push_block, push_block_with_hooks, push_transaction, push_transaction_with_hooks};
pub use skip::SkipFlags;

#[cfg(test)]
mod tests;
