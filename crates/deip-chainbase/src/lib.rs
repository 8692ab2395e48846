//! The object database: typed multi-index tables with a nested
//! undo-session stack (§4.1). This crate has no notion of transactions,
//! blocks, or evaluators — `deip-chain` builds those on top of the
//! primitives here.

pub mod db;
pub mod session;
pub mod table;
pub mod tables;

pub use db::{Database, TableAccess};
pub use session::{SessionStack, UndoAction, UndoLog};
pub use table::PrimaryTable;
