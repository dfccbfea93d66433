//! # Watcher Configuration
//!
//! Defaults, a small test profile, and environment overrides.

use serde::{Deserialize, Serialize};
use shared_types::{parse_address, Address, BlockNumber};
use tracing::{info, warn};

use crate::domain::WatcherRole;

/// Chain watcher configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Root contract to watch.
    pub contract_address: Address,

    /// Deployment block; replay origin when no checkpoint exists.
    pub start_block: BlockNumber,

    /// Capacity of each bounded live-event channel.
    pub channel_capacity: usize,

    /// Historical queries cover at most this many blocks each.
    pub replay_chunk_blocks: u64,

    /// Which live events are applied.
    pub role: WatcherRole,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            contract_address: [0u8; 20],
            start_block: 0,
            channel_capacity: 1024,
            replay_chunk_blocks: 10_000,
            role: WatcherRole::Observer,
        }
    }
}

impl WatcherConfig {
    /// Small channels and chunks so tests exercise the boundaries.
    pub fn for_testing() -> Self {
        Self {
            contract_address: [0xAB; 20],
            start_block: 0,
            channel_capacity: 16,
            replay_chunk_blocks: 4,
            role: WatcherRole::Observer,
        }
    }

    /// Defaults overridden by `TC_CONTRACT_ADDRESS`, `TC_START_BLOCK`,
    /// `TC_CHANNEL_CAPACITY`, `TC_REPLAY_CHUNK_BLOCKS` and `TC_ROLE`.
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("TC_CONTRACT_ADDRESS") {
            match parse_address(&raw) {
                Ok(address) => {
                    config.contract_address = address;
                    info!("Loaded contract address from environment");
                }
                Err(e) => warn!("TC_CONTRACT_ADDRESS ignored: {}", e),
            }
        }
        if let Ok(raw) = std::env::var("TC_START_BLOCK") {
            if let Ok(block) = raw.parse() {
                config.start_block = block;
            }
        }
        if let Ok(raw) = std::env::var("TC_CHANNEL_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.channel_capacity = capacity,
                _ => warn!("TC_CHANNEL_CAPACITY must be a positive integer"),
            }
        }
        if let Ok(raw) = std::env::var("TC_REPLAY_CHUNK_BLOCKS") {
            match raw.parse::<u64>() {
                Ok(chunk) if chunk > 0 => config.replay_chunk_blocks = chunk,
                _ => warn!("TC_REPLAY_CHUNK_BLOCKS must be a positive integer"),
            }
        }
        if let Ok(raw) = std::env::var("TC_ROLE") {
            match raw.to_lowercase().as_str() {
                "observer" => config.role = WatcherRole::Observer,
                "validator" => config.role = WatcherRole::Validator,
                other => warn!("TC_ROLE '{}' unknown, keeping {:?}", other, config.role),
            }
        }

        config
    }

    /// Builder-style role override.
    pub fn with_role(mut self, role: WatcherRole) -> Self {
        self.role = role;
        self
    }
}
