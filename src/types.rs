use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Scheduling hint handed to the [`Scheduler`](crate::scheduler::Scheduler).
///
/// Ordering is `Low < Default < High`. A scheduler that honours priorities
/// picks higher values first under contention; it never affects correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Default,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Default
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "default" => Ok(Priority::Default),
            "high" => Ok(Priority::High),
            other => Err(format!(
                "invalid priority: {other} (expected \"low\", \"default\" or \"high\")"
            )),
        }
    }
}

/// Lifecycle of a single invocation.
///
/// Transitions are strictly `Scheduled -> Running -> Completing -> Delivered`;
/// `Delivered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Scheduled,
    Running,
    Completing,
    Delivered,
}
