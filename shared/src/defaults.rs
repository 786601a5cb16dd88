//! Default values and operational constants
//!
//! This module centralizes the periodic-loop intervals, the restart budget,
//! and the default bind addresses used by both node roles.

// Worker loop cadences

/// Interval between executor ticks; one queued event is processed per tick (10 seconds)
pub const RUN_TASKS_INTERVAL_SECS: u64 = 10;

/// Interval between reconciler passes over running containers (30 seconds)
pub const UPDATE_TASKS_INTERVAL_SECS: u64 = 30;

/// Interval between host stats collections (60 seconds)
pub const COLLECT_STATS_INTERVAL_SECS: u64 = 60;

// Manager loop cadences

/// Interval between scheduler ticks; one pending event is dispatched per tick (10 seconds)
pub const PROCESS_TASKS_INTERVAL_SECS: u64 = 10;

/// Interval between health-monitor passes over the task database (60 seconds)
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

// Failure policy

/// Maximum automatic restarts before the health monitor gives up on a task
pub const MAX_RESTARTS: u32 = 3;

// HTTP

/// Bound on every outbound HTTP call (30 seconds)
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default bind host for either role
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default worker API port
pub const DEFAULT_WORKER_PORT: u16 = 5555;

/// Default manager API port
pub const DEFAULT_MANAGER_PORT: u16 = 5556;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_budget_is_bounded() {
        assert!(MAX_RESTARTS > 0);
        assert!(MAX_RESTARTS <= 10);
    }

    #[test]
    fn test_ports_do_not_collide() {
        assert_ne!(DEFAULT_WORKER_PORT, DEFAULT_MANAGER_PORT);
    }
}
