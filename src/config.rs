//! Configuration for the sync pipeline.
//!
//! # Example
//!
//! ```
//! use task_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.max_retries, 3);
//! assert_eq!(config.replay_interval_secs, 30);
//!
//! // Full config
//! let config = SyncConfig {
//!     channel_capacity: 500,
//!     retry_delay_ms: 1000,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the sync pipeline.
///
/// All fields have defaults matching the production policy: 3 retries at a
/// fixed 2 second delay, a 30 second replay interval, and a replay batch of
/// 100 entries.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Mutation channel capacity (bounded; senders block when full)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Retries after the initial upsert attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between upsert attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Seconds between dead-letter replay scans
    #[serde(default = "default_replay_interval_secs")]
    pub replay_interval_secs: u64,

    /// Maximum dead-letter entries fetched per replay scan
    #[serde(default = "default_replay_batch_size")]
    pub replay_batch_size: usize,

    /// Name of the search index documents are upserted into
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// What to do with dead-letter entries whose payload no longer
    /// deserializes (see [`PoisonPolicy`])
    #[serde(default)]
    pub poison_policy: PoisonPolicy,
}

/// Policy for dead-letter entries that fail to deserialize during replay.
///
/// `Retain` keeps the entry in the store, so it is retried (and logged) on
/// every scan until an operator intervenes. `Discard` deletes it, accepting
/// the data loss in exchange for a clean store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoisonPolicy {
    #[default]
    Retain,
    Discard,
}

fn default_channel_capacity() -> usize { 200 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 2_000 }
fn default_replay_interval_secs() -> u64 { 30 }
fn default_replay_batch_size() -> usize { 100 }
fn default_index_name() -> String { crate::index::DEFAULT_INDEX_NAME.to_string() }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            replay_interval_secs: default_replay_interval_secs(),
            replay_batch_size: default_replay_batch_size(),
            index_name: default_index_name(),
            poison_policy: PoisonPolicy::default(),
        }
    }
}
