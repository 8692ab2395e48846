pub mod asset;
pub mod block;
pub mod constants;
pub mod error;
pub mod model;
pub mod operation;
pub mod transaction;
pub mod types;
pub mod virtual_op;

pub use asset::{Asset, AssetSymbol};
pub use block::{Block, BlockExtension, BlockHeader};
pub use constants::*;
pub use error::DeipError;
pub use operation::Operation;
pub use transaction::{SignedTransaction, Transaction, TransactionExtension};
pub use types::*;
pub use virtual_op::VirtualOperation;
