// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic for transient failures.
//!
//! Provides configurable retry behavior with presets for the different call
//! sites. The index-upsert preset uses a fixed inter-attempt delay (factor
//! 1.0); raising the factor turns it into exponential backoff without
//! changing the maximum-attempts contract.
//!
//! # Example
//!
//! ```
//! use task_sync::RetryConfig;
//! use std::time::Duration;
//!
//! // Index upsert: initial attempt + 3 retries, fixed 2s apart
//! let upsert = RetryConfig::index_upsert(3, Duration::from_secs(2));
//! assert_eq!(upsert.max_attempts, 4);
//!
//! // Startup: fail fast on bad config
//! let startup = RetryConfig::startup();
//! assert_eq!(startup.max_attempts, 5);
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for operation retry behavior.
///
/// Use the preset constructors for common patterns:
/// - [`RetryConfig::index_upsert()`] - fixed-delay retries for index writes
/// - [`RetryConfig::startup()`] - fast-fail for initial connections
/// - [`RetryConfig::query()`] - quick retry for individual store operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Total attempts, including the initial one.
    pub max_attempts: usize,
}

impl RetryConfig {
    /// Fixed-delay retry for index upserts: the initial attempt plus
    /// `retries` additional attempts, `delay` apart. Factor 1.0 keeps the
    /// delay constant between attempts.
    #[must_use]
    pub fn index_upsert(retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: retries as usize + 1,
            initial_delay: delay,
            max_delay: delay,
            factor: 1.0,
        }
    }

    /// Fast-fail retry for initial startup connections.
    /// Attempts 5 times with exponential backoff, failing after ~5 seconds.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Quick retry for individual store operations (don't block forever).
    /// 3 attempts with fast backoff; if it fails, let the caller handle it.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }
}

pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempts
                    );
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                if attempts >= config.max_attempts {
                    return Err(err);
                }

                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation_name, attempts, config.max_attempts, err, delay
                );

                sleep(delay).await;
                delay = (delay.mul_f64(config.factor)).min(config.max_delay);
            }
        }
    }
}
