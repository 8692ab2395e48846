//! ─── DEIP Chain Constants ───────────────────────────────────────────────────
//!
//! Values a reference implementation would ship for the chain described in
//! this crate: block timing, scheduler sizing, authority recursion bound,
//! and the ECI pricing coefficients.

// ── Block timing ─────────────────────────────────────────────────────────────

/// Seconds between blocks. Slot math (`slot_time`, `slot_at_time`) is defined
/// against this interval.
pub const BLOCK_INTERVAL_SECS: i64 = 3;

/// Core asset ticker and precision (§6: asset is `(i64 amount, 8-byte symbol)`).
pub const CORE_ASSET_SYMBOL: &str = "DEIP";
pub const CORE_ASSET_PRECISION: u8 = 6;

// ── Authority ─────────────────────────────────────────────────────────────────

/// Maximum recursion depth when resolving an account authority through
/// nested account references (§4.2).
pub const MAX_AUTHORITY_RECURSION_DEPTH: u8 = 2;

/// Maximum recursion depth when following a witness-vote proxy chain (§4.3).
pub const MAX_PROXY_RECURSION_DEPTH: u8 = 4;

/// Maximum nesting depth for proposal updates approving other proposals (§4.6).
pub const MAX_PROPOSAL_NESTING_DEPTH: u8 = 4;

// ── Witness scheduler ────────────────────────────────────────────────────────

/// Number of top-voted witnesses selected each shuffle round.
pub const MAX_VOTED_WITNESSES: usize = 19;

/// Number of virtual-time runner slots selected each shuffle round.
pub const MAX_RUNNER_WITNESSES: usize = 1;

/// Total scheduled witnesses per round (`MAX_VOTED_WITNESSES + MAX_RUNNER_WITNESSES`).
pub const MAX_WITNESSES: usize = MAX_VOTED_WITNESSES + MAX_RUNNER_WITNESSES;

/// Missed-block count within one shuffle window that clears a witness's
/// signing key, forcing re-registration (§4.7).
pub const MAX_WITNESS_MISSED_BLOCKS: u32 = 50;

/// Width of the virtual-time fixed-point representation used for
/// `virtual_scheduled_time`/`virtual_position` (128-bit fixed-point per §3).
pub const VIRTUAL_SCHEDULE_LAP_LENGTH: u128 = 1_000 * MAX_VOTED_WITNESSES as u128;

// ── TaPOS / expiration ───────────────────────────────────────────────────────

/// Size of the block-summary ring buffer (§3): `block_num mod 2^16`.
pub const BLOCK_SUMMARY_WINDOW: usize = 65_536;

/// Maximum seconds a transaction's `expiration` may sit ahead of head block
/// time before it is rejected as too-far-future (§6 TaPOS).
pub const DEIP_MAX_TIME_UNTIL_EXPIRATION: i64 = 60 * 60;

// ── Participation / irreversibility ──────────────────────────────────────────

/// Width of the rolling participation bitset (§3 dynamic global properties).
pub const RECENT_SLOTS_FILLED_WINDOW: u32 = 128;

// ── ECI pricing (§4.4) ───────────────────────────────────────────────────────

/// Expertise-agreement coefficient in the influence factor `C_r`.
pub const C_EA: f64 = 8.0;

/// Constant-value coefficient in the influence factor `C_r`.
pub const C_VA: f64 = 1.0;

/// Per-vote curator bonus added to a review's weight.
pub const C_CURATOR_BONUS: i64 = 1;

// ── Research token sale (§4.5) ───────────────────────────────────────────────

/// Minimum non-zero contribution accepted by a token sale.
pub const MIN_TOKEN_SALE_CONTRIBUTION: i64 = 1;

// ── Account / authority shape ─────────────────────────────────────────────────

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;

/// Maximum byte length of a `transfer` memo.
pub const MAX_MEMO_LENGTH: usize = 2048;

/// Research group member token weights must sum to exactly this many
/// basis points (100.00%).
pub const FULL_MEMBER_WEIGHT_BASIS_POINTS: u16 = 10_000;

// ── Account recovery (§4.3) ───────────────────────────────────────────────────

/// How long a filed `request_account_recovery` stays eligible for
/// `recover_account` before it must be re-filed.
pub const ACCOUNT_RECOVERY_REQUEST_EXPIRATION_SECS: i64 = 60 * 60 * 24;

/// How long after an owner-authority change the *previous* owner
/// authority remains acceptable as `recent_owner_authority` in
/// `recover_account` (§3 `Account::last_owner_update`).
pub const OWNER_AUTH_RECOVERY_WINDOW_SECS: i64 = 60 * 60 * 24 * 30;
