//! Node-level errors: failures that happen around the chain-core rather
//! than inside it — loading config/genesis, a poisoned read lock.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("reading config file {0}: {1}")]
    ConfigIo(String, #[source] std::io::Error),

    #[error("parsing config: {0}")]
    ConfigParse(String),

    #[error("reading genesis record {0}: {1}")]
    GenesisIo(String, #[source] std::io::Error),

    #[error("parsing genesis record: {0}")]
    GenesisParse(String),

    #[error(transparent)]
    Genesis(#[from] deip_genesis::GenesisError),

    #[error(transparent)]
    Chain(#[from] deip_core::error::DeipError),

    #[error("database lock poisoned")]
    LockPoisoned,
}
