use failsafe::backoff::Exponential;
use failsafe::failure_policy::ConsecutiveFailures;
use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding one simulated upstream source.
pub type SourceBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Consecutive failures that open a source's circuit.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Creates a circuit breaker for a source partition so a flapping source
/// fails fast instead of costing its full latency on every fan-out.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, fetches pass through.
/// - **OPEN**: Too many failures, fetches are rejected without running.
/// - **HALF_OPEN**: Testing if the source recovered.
pub fn create_source_circuit_breaker() -> SourceBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
