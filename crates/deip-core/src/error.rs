//! Error taxonomy (§7). Each nested enum is one error group; `DeipError`
//! wraps them with `#[from]` so callers can match on the group without
//! string comparison, while still getting one flat `Display` message.

use thiserror::Error;

/// Malformed input caught before any state is touched: bad shapes, bad
/// ranges, structurally invalid operations.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid account name: {0}")]
    InvalidAccountName(String),

    #[error("malformed external id: {0}")]
    MalformedExternalId(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("asset symbol mismatch: expected {expected}, got {got}")]
    AssetSymbolMismatch { expected: String, got: String },

    #[error("operation list is empty")]
    EmptyOperationList,

    #[error("memo exceeds maximum length of {max} bytes")]
    MemoTooLong { max: usize },

    #[error("weight threshold must be greater than zero")]
    ZeroWeightThreshold,

    #[error("authority has no keys or accounts")]
    EmptyAuthority,

    #[error("{0}")]
    Other(String),
}

/// Failures while resolving or checking an authority (§4.2).
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("missing required authority for account {account} at level {level}")]
    MissingAuthority { account: String, level: String },

    #[error("authority recursion depth exceeded (max {max})")]
    RecursionDepthExceeded { max: u8 },

    #[error("signature does not recover to a known key")]
    UnrecoverableSignature,

    #[error("duplicate signature in transaction")]
    DuplicateSignature,

    #[error("irrelevant signature present (key not used by any required authority)")]
    IrrelevantSignature,

    #[error("signature threshold not met: need {need}, got {got}")]
    ThresholdNotMet { need: u32, got: u32 },
}

/// TaPOS and expiration checks (§4.8).
#[derive(Debug, Error)]
pub enum TaposError {
    #[error("transaction has expired (expiration {expiration} <= head block time {head_time})")]
    Expired { expiration: i64, head_time: i64 },

    #[error("expiration too far in the future (max {max} seconds ahead)")]
    ExpirationTooFar { max: u32 },

    #[error("ref_block_num {ref_block_num} not found in the recent block summary window")]
    UnknownRefBlock { ref_block_num: u16 },

    #[error("ref_block_prefix mismatch for block {ref_block_num}")]
    RefBlockPrefixMismatch { ref_block_num: u16 },
}

/// Failures raised by an operation evaluator while applying state (§4.3).
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: i64, have: i64 },

    #[error("unknown research: {0}")]
    UnknownResearch(String),

    #[error("unknown research content: {0}")]
    UnknownResearchContent(String),

    #[error("unknown research group: {0}")]
    UnknownResearchGroup(String),

    #[error("unknown token sale: {0}")]
    UnknownTokenSale(String),

    #[error("token sale not active")]
    TokenSaleNotActive,

    #[error("token sale contribution below minimum ({min})")]
    ContributionTooLow { min: i64 },

    #[error("unknown discipline: {0}")]
    UnknownDiscipline(u32),

    #[error("unknown proposal: {0}")]
    UnknownProposal(String),

    #[error("proposal already expired")]
    ProposalExpired,

    #[error("proposal already resolved")]
    ProposalAlreadyResolved,

    #[error("review already submitted by {0} for this content")]
    DuplicateReview(String),

    #[error("self-transfer not allowed")]
    SelfTransfer,

    #[error("recovery not active for account {0}")]
    RecoveryNotActive(String),

    #[error("witness not found: {0}")]
    UnknownWitness(String),

    #[error("vote weight exceeds remaining expertise balance")]
    InsufficientExpertise,

    #[error("{0}")]
    Other(String),
}

/// Block-level structural and consensus checks (§4.7, §4.8).
#[derive(Debug, Error)]
pub enum BlockValidationError {
    #[error("block signed by a witness not in the active schedule")]
    WitnessNotScheduled,

    #[error("block arrived for the wrong slot (expected witness {expected}, got {got})")]
    WrongSlotWitness { expected: String, got: String },

    #[error("block timestamp {got} is not aligned to the block interval")]
    MisalignedTimestamp { got: i64 },

    #[error("block timestamp {got} is not after parent timestamp {parent}")]
    TimestampNotMonotonic { got: i64, parent: i64 },

    #[error("previous block id mismatch")]
    PreviousIdMismatch,

    #[error("transaction merkle root mismatch")]
    MerkleRootMismatch,

    #[error("block exceeds maximum size")]
    BlockTooLarge,

    #[error("block signature does not verify against the scheduled witness key")]
    InvalidWitnessSignature,
}

/// Fork database and reorg handling (§4.8).
#[derive(Debug, Error)]
pub enum ForkError {
    #[error("block {0} does not link to any known fork")]
    Disconnected(String),

    #[error("block {0} is already irreversible; cannot reorganize past it")]
    BelowIrreversible(String),

    #[error("no viable fork head")]
    NoViableHead,
}

/// Chainbase undo-session misuse (§4.1).
#[derive(Debug, Error)]
pub enum UndoError {
    #[error("no undo session open")]
    NoSessionOpen,

    #[error("attempted to pop past the irreversible commit point")]
    PastCommitPoint,

    #[error("session stack depth exceeded (max {max})")]
    DepthExceeded { max: usize },
}

/// Plugin/observer hook failures (§5 external interfaces).
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{0}' failed during block-applied notification: {1}")]
    NotificationFailed(String, String),
}

#[derive(Debug, Error)]
pub enum DeipError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Tapos(#[from] TaposError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    BlockValidation(#[from] BlockValidationError),

    #[error(transparent)]
    Fork(#[from] ForkError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
