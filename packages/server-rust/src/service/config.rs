use std::num::NonZeroU32;
use std::time::Duration;

use super::telemetry::Telemetry;

/// Server-level configuration for the endpoint pipeline.
///
/// Each operation carries its own [`EndpointConfig`] so rate limits and
/// breaker thresholds can differ per operation.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline applied to every call, in milliseconds.
    pub default_operation_timeout_ms: u64,
    pub sum: EndpointConfig,
    pub concat: EndpointConfig,
    /// Where every endpoint sends spans, log records and metrics.
    pub telemetry: Telemetry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 30_000,
            sum: EndpointConfig {
                rate_limit: RateLimitConfig::new(1, 1),
                breaker: BreakerConfig::default(),
            },
            concat: EndpointConfig {
                rate_limit: RateLimitConfig::new(1, 100),
                breaker: BreakerConfig::default(),
            },
            telemetry: Telemetry::disabled(),
        }
    }
}

/// Per-operation decorator settings, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
    pub rate_limit: RateLimitConfig,
    pub breaker: BreakerConfig,
}

/// Token-bucket parameters: `per_second` tokens refill each second, up to `burst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_second: NonZeroU32,
    pub burst: NonZeroU32,
}

impl RateLimitConfig {
    /// Zero values are clamped to one.
    #[must_use]
    pub fn new(per_second: u32, burst: u32) -> Self {
        Self {
            per_second: NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN),
            burst: NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Circuit-breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures in the closed state that open the circuit.
    pub failure_threshold: u32,
    /// Failure counts in the closed state are cleared after this window.
    pub window: Duration,
    /// Time spent open before trial calls are admitted.
    pub cooldown: Duration,
    /// Trial calls admitted concurrently while half-open.
    pub half_open_max_calls: u32,
    /// Consecutive trial successes that close the circuit.
    pub success_threshold: u32,
}

impl BreakerConfig {
    /// Copy with every count clamped to at least one. A zero trial budget
    /// would leave a half-open circuit unable to ever close.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            failure_threshold: self.failure_threshold.max(1),
            half_open_max_calls: self.half_open_max_calls.max(1),
            success_threshold: self.success_threshold.max(1),
            ..self
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
            half_open_max_calls: 1,
            success_threshold: 1,
        }
    }
}
