//! Node configuration (§6): CLI overrides layered on a `serde`-deserialized
//! file, so a deployment can keep most settings in a checked-in file and
//! reach for a flag only when it needs to override one for a single run.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use deip_chain::SkipFlags;
use deip_core::types::{AccountName, Sha256Digest};

use crate::error::NodeError;

/// File-backed configuration layer (§6's `Configuration` block). Every
/// field is optional so a config file only needs to name what it wants to
/// change from the all-validating defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfigFile {
    pub chain_id_override: Option<String>,
    pub skip_witness_signature: Option<bool>,
    pub skip_tapos_check: Option<bool>,
    pub skip_authority_check: Option<bool>,
    pub skip_merkle_check: Option<bool>,
    pub skip_witness_schedule_check: Option<bool>,
    pub flush_interval_blocks: Option<u64>,
    pub tenant: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "deip-node", version, about = "DEIP chain-core node")]
pub struct Args {
    /// Path to the genesis record (JSON, §6).
    #[arg(long)]
    pub genesis: PathBuf,

    /// Optional config file (JSON) layering §6's recognized keys on top of
    /// the defaults; CLI flags below override whatever it sets.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Force a chain id during replay. Only legal together with the
    /// `skip_*` flags — never honored over the network (§6).
    #[arg(long)]
    pub chain_id_override: Option<String>,

    #[arg(long)]
    pub skip_witness_signature: bool,

    #[arg(long)]
    pub skip_tapos_check: bool,

    #[arg(long)]
    pub skip_authority_check: bool,

    #[arg(long)]
    pub skip_merkle_check: bool,

    #[arg(long)]
    pub skip_witness_schedule_check: bool,

    /// How many blocks to hold between logging a block-log flush point.
    /// No real storage layer backs it — `Node`'s block log is in-memory —
    /// so this controls logging cadence, not a real fsync.
    #[arg(long)]
    pub flush_interval_blocks: Option<u64>,

    /// Account this node speaks for as a tenant (§4.2 tenant co-signature).
    #[arg(long)]
    pub tenant: Option<String>,
}

/// The resolved, validated configuration a [`crate::Node`] is built from.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub genesis_path: PathBuf,
    pub chain_id_override: Option<Sha256Digest>,
    pub skip: SkipFlags,
    pub flush_interval_blocks: u64,
    pub tenant: Option<AccountName>,
}

impl NodeConfig {
    pub fn from_args(args: Args) -> Result<Self, NodeError> {
        let file = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| NodeError::ConfigIo(path.display().to_string(), e))?;
                serde_json::from_str::<NodeConfigFile>(&json).map_err(|e| NodeError::ConfigParse(e.to_string()))?
            }
            None => NodeConfigFile::default(),
        };

        let chain_id_override = args
            .chain_id_override
            .or(file.chain_id_override)
            .map(|hex_str| parse_chain_id(&hex_str))
            .transpose()?;

        let skip = SkipFlags {
            witness_signature: args.skip_witness_signature || file.skip_witness_signature.unwrap_or(false),
            tapos_check: args.skip_tapos_check || file.skip_tapos_check.unwrap_or(false),
            authority_check: args.skip_authority_check || file.skip_authority_check.unwrap_or(false),
            merkle_check: args.skip_merkle_check || file.skip_merkle_check.unwrap_or(false),
            witness_schedule_check: args.skip_witness_schedule_check || file.skip_witness_schedule_check.unwrap_or(false),
        };

        let flush_interval_blocks = args.flush_interval_blocks.or(file.flush_interval_blocks).unwrap_or(10_000);

        let tenant = args.tenant.or(file.tenant).map(AccountName::new_unchecked);

        Ok(Self { genesis_path: args.genesis, chain_id_override, skip, flush_interval_blocks, tenant })
    }
}

fn parse_chain_id(hex_str: &str) -> Result<Sha256Digest, NodeError> {
    let bytes = hex::decode(hex_str).map_err(|e| NodeError::ConfigParse(format!("chain_id_override: {e}")))?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| NodeError::ConfigParse("chain_id_override must be 32 bytes".into()))?;
    Ok(Sha256Digest(array))
}
