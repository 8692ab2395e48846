//! Authority resolution (§4.2): recover signer keys, build the required
//! authority set for a list of operations, and recursively check that
//! every required authority's weight threshold is met. Pure — storage is
//! reached only through the [`AuthorityLookup`] trait passed in, so the
//! solver has no dependency on chainbase.

mod solver;

pub use solver::{verify_authority, AuthorityLookup, VerifyAuthorityInput};
