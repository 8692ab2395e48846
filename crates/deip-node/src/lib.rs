//! The in-process node wiring (§5, §6): a writer over chainbase + chain +
//! consensus + genesis, exposing exactly the four collaboration points
//! §1/§6 name — a read-lock snapshot, transaction submission, the event
//! stream, and virtual operations. No network, no RPC server, no wallet:
//! those are out of scope (§1) and live, if anywhere, in a process built
//! on top of this crate.

pub mod config;
pub mod error;
pub mod node;

pub use config::{Args, NodeConfig, NodeConfigFile};
pub use error::NodeError;
pub use node::Node;
