//! Domain services (§4.3, §4.7): plain functions over [`deip_chainbase::Database`],
//! one module per entity family. Evaluators call these; they never touch
//! the table layer directly themselves.

pub mod accounts;
pub mod authority;
pub mod expertise;
pub mod funds;
pub mod proposals;
pub mod research;
pub mod witnesses;
